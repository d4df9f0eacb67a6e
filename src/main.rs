fn main() {
    if let Err(err) = sdg_data_filler::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
