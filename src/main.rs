fn main() -> std::process::ExitCode {
    paperlens_lib::run()
}
