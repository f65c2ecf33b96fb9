fn main() {
    if let Err(err) = intel_import::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
