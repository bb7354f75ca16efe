use serde::Serialize;

use crate::sensing::fusion::AttentionStatus;

use super::AudioPlayback;

const ENABLE_LOGS: bool = true;

/// The alarm always plays at full output volume.
pub const ALARM_VOLUME: f32 = 1.0;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlarmState {
    /// Session not started; status changes are ignored.
    Idle,
    /// Armed and silent.
    ArmedFocused,
    /// Looping at full volume until focus returns.
    Alarming,
}

/// Sounds the alarm while the debounced status is distracted.
///
/// Playback failures never move the state machine: a failed start leaves it
/// `Alarming` with a pending retry that the next [`AlarmController::enforce`]
/// picks up. Failures the output reports after the fact (see
/// [`AudioPlayback::take_fault`]) are treated the same way.
pub struct AlarmController {
    state: AlarmState,
    playback: Box<dyn AudioPlayback>,
    retry_pending: bool,
}

impl AlarmController {
    pub fn new(playback: Box<dyn AudioPlayback>) -> Self {
        playback.set_looping(true);
        Self {
            state: AlarmState::Idle,
            playback,
            retry_pending: false,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    /// Start command. Plays and immediately stops once so the output device is
    /// open before the first real alarm.
    pub fn arm(&mut self) {
        if self.state != AlarmState::Idle {
            return;
        }

        self.playback.set_looping(true);
        let unlock = self
            .playback
            .play()
            .and_then(|_| self.playback.pause())
            .and_then(|_| self.playback.rewind());
        if let Err(err) = unlock {
            log_warn!("alarm audio init failed: {err:?}");
        }

        self.state = AlarmState::ArmedFocused;
        self.retry_pending = false;
        log_info!("alarm armed");
    }

    /// React to a debounced status change.
    pub fn on_status(&mut self, status: AttentionStatus) {
        match (self.state, status) {
            (AlarmState::ArmedFocused, AttentionStatus::Distracted) => {
                self.state = AlarmState::Alarming;
                self.sound();
            }
            (AlarmState::Alarming, AttentionStatus::Focused) => {
                self.state = AlarmState::ArmedFocused;
                self.retry_pending = false;
                self.silence();
            }
            _ => {}
        }
    }

    /// Supervisory check, once per second. Only acts while alarming: puts the
    /// volume back to max and retries a playback start that failed earlier.
    pub fn enforce(&mut self) {
        if self.state != AlarmState::Alarming {
            return;
        }

        if let Some(fault) = self.playback.take_fault() {
            log_error!("alarm output reported a failure, retrying: {fault}");
            self.retry_pending = true;
        }

        if self.retry_pending {
            self.sound();
            return;
        }

        let current = self.playback.volume();
        if current != ALARM_VOLUME {
            log_warn!("alarm volume changed externally ({current:.2}); restoring {ALARM_VOLUME:.2}");
            if let Err(err) = self.playback.set_volume(ALARM_VOLUME) {
                log_error!("failed to restore alarm volume: {err:?}");
            }
        }
    }

    /// Session teardown: stop sound, free the device, back to idle.
    pub fn release(&mut self) {
        if self.state == AlarmState::Alarming {
            self.silence();
        }
        self.playback.release();
        self.state = AlarmState::Idle;
        self.retry_pending = false;
    }

    fn sound(&mut self) {
        // stale faults belong to earlier commands
        let _ = self.playback.take_fault();
        self.playback.set_looping(true);
        let result = self
            .playback
            .set_volume(ALARM_VOLUME)
            .and_then(|_| self.playback.play());

        match result {
            Ok(()) => {
                self.retry_pending = false;
                log_info!("alarm sounding");
            }
            Err(err) => {
                self.retry_pending = true;
                log_error!("alarm playback failed, retrying next check: {err:?}");
            }
        }
    }

    fn silence(&mut self) {
        let result = self
            .playback
            .pause()
            .and_then(|_| self.playback.rewind());
        if let Err(err) = result {
            log_error!("failed to silence alarm: {err:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Looping(bool),
        Volume(f32),
        Play,
        Pause,
        Rewind,
        Release,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        volume: f32,
        fail_play: bool,
        fault: Option<String>,
    }

    #[derive(Clone, Default)]
    struct FakePlayback(Arc<Mutex<Recorder>>);

    impl FakePlayback {
        fn calls(&self) -> Vec<Call> {
            self.0.lock().unwrap().calls.clone()
        }

        fn clear(&self) {
            self.0.lock().unwrap().calls.clear();
        }

        fn fail_play(&self, fail: bool) {
            self.0.lock().unwrap().fail_play = fail;
        }

        fn tamper_volume(&self, volume: f32) {
            self.0.lock().unwrap().volume = volume;
        }

        fn report_fault(&self, fault: &str) {
            self.0.lock().unwrap().fault = Some(fault.to_string());
        }
    }

    impl AudioPlayback for FakePlayback {
        fn set_looping(&self, looping: bool) {
            self.0.lock().unwrap().calls.push(Call::Looping(looping));
        }

        fn volume(&self) -> f32 {
            self.0.lock().unwrap().volume
        }

        fn set_volume(&self, volume: f32) -> Result<()> {
            let mut rec = self.0.lock().unwrap();
            rec.volume = volume;
            rec.calls.push(Call::Volume(volume));
            Ok(())
        }

        fn play(&self) -> Result<()> {
            let mut rec = self.0.lock().unwrap();
            rec.calls.push(Call::Play);
            if rec.fail_play {
                bail!("device busy");
            }
            Ok(())
        }

        fn pause(&self) -> Result<()> {
            self.0.lock().unwrap().calls.push(Call::Pause);
            Ok(())
        }

        fn rewind(&self) -> Result<()> {
            self.0.lock().unwrap().calls.push(Call::Rewind);
            Ok(())
        }

        fn release(&self) {
            self.0.lock().unwrap().calls.push(Call::Release);
        }

        fn take_fault(&self) -> Option<String> {
            self.0.lock().unwrap().fault.take()
        }
    }

    fn armed() -> (AlarmController, FakePlayback) {
        let fake = FakePlayback::default();
        let mut alarm = AlarmController::new(Box::new(fake.clone()));
        alarm.arm();
        fake.clear();
        (alarm, fake)
    }

    #[test]
    fn idle_ignores_status() {
        let fake = FakePlayback::default();
        let mut alarm = AlarmController::new(Box::new(fake.clone()));
        fake.clear();

        alarm.on_status(AttentionStatus::Distracted);
        alarm.enforce();
        assert_eq!(alarm.state(), AlarmState::Idle);
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn arming_unlocks_the_device() {
        let fake = FakePlayback::default();
        let mut alarm = AlarmController::new(Box::new(fake.clone()));
        fake.clear();

        alarm.arm();
        assert_eq!(alarm.state(), AlarmState::ArmedFocused);
        assert_eq!(
            fake.calls(),
            vec![Call::Looping(true), Call::Play, Call::Pause, Call::Rewind]
        );
    }

    #[test]
    fn arming_survives_unlock_failure() {
        let fake = FakePlayback::default();
        fake.fail_play(true);
        let mut alarm = AlarmController::new(Box::new(fake.clone()));
        alarm.arm();
        assert_eq!(alarm.state(), AlarmState::ArmedFocused);
    }

    #[test]
    fn distraction_sounds_at_max_volume_and_focus_silences() {
        let (mut alarm, fake) = armed();

        alarm.on_status(AttentionStatus::Distracted);
        assert_eq!(alarm.state(), AlarmState::Alarming);
        assert_eq!(
            fake.calls(),
            vec![Call::Looping(true), Call::Volume(1.0), Call::Play]
        );

        fake.clear();
        alarm.on_status(AttentionStatus::Focused);
        assert_eq!(alarm.state(), AlarmState::ArmedFocused);
        assert_eq!(fake.calls(), vec![Call::Pause, Call::Rewind]);
    }

    #[test]
    fn supervisor_restores_volume_only_while_alarming() {
        let (mut alarm, fake) = armed();
        fake.tamper_volume(0.2);
        alarm.enforce();
        assert!(fake.calls().is_empty());

        alarm.on_status(AttentionStatus::Distracted);
        fake.tamper_volume(0.2);
        fake.clear();
        alarm.enforce();
        assert_eq!(fake.calls(), vec![Call::Volume(1.0)]);

        fake.clear();
        alarm.enforce();
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn failed_playback_stays_alarming_and_retries() {
        let (mut alarm, fake) = armed();
        fake.fail_play(true);

        alarm.on_status(AttentionStatus::Distracted);
        assert_eq!(alarm.state(), AlarmState::Alarming);
        assert!(alarm.retry_pending());

        fake.clear();
        alarm.enforce();
        assert!(fake.calls().contains(&Call::Play));
        assert!(alarm.retry_pending());

        fake.fail_play(false);
        alarm.enforce();
        assert!(!alarm.retry_pending());
        assert_eq!(alarm.state(), AlarmState::Alarming);
    }

    #[test]
    fn late_output_fault_is_retried_by_supervisor() {
        let (mut alarm, fake) = armed();
        alarm.on_status(AttentionStatus::Distracted);
        assert!(!alarm.retry_pending());

        // the device fails after play() already returned
        fake.report_fault("stream closed");
        fake.clear();
        alarm.enforce();
        assert_eq!(
            fake.calls(),
            vec![Call::Looping(true), Call::Volume(1.0), Call::Play]
        );
        assert!(!alarm.retry_pending());
        assert_eq!(alarm.state(), AlarmState::Alarming);
    }

    #[test]
    fn faults_are_ignored_outside_alarming() {
        let (mut alarm, fake) = armed();
        fake.report_fault("stream closed");
        alarm.enforce();
        assert!(fake.calls().is_empty());
        assert_eq!(alarm.state(), AlarmState::ArmedFocused);
    }

    #[test]
    fn release_returns_to_idle() {
        let (mut alarm, fake) = armed();
        alarm.on_status(AttentionStatus::Distracted);
        fake.clear();

        alarm.release();
        assert_eq!(alarm.state(), AlarmState::Idle);
        assert_eq!(fake.calls(), vec![Call::Pause, Call::Rewind, Call::Release]);
    }
}
