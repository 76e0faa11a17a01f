use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    crossfold::cli::run_assign_folds(std::env::args().skip(1))
}
