fn main() -> std::process::ExitCode {
    auto_organize_lib::run()
}
