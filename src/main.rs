fn main() {
    if let Err(e) = pathfinder::app::run_cli() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
