use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    crossfold::cli::run_combine_predictions(std::env::args().skip(1))
}
