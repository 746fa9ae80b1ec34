fn main() {
    std::process::exit(cheddar_session::replay::run_from_env());
}
