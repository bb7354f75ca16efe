fn main() {
    focusflow_lib::run()
}
