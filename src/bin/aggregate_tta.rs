use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    crossfold::cli::run_aggregate_tta(std::env::args().skip(1))
}
