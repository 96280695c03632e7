use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    chara_png::cli::main()
}
