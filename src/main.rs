fn main() {
    if let Err(err) = finpulse::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
