use clap::Parser;
use clap::error::ErrorKind;
use pdfside_docx::{ConvertOptions, Converter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdfside-docx", version, about = "Convert PDF files to DOCX")]
struct Args {
    /// Input PDF file
    input: PathBuf,
    /// Output DOCX file
    output: PathBuf,
    /// First page to convert (1-based)
    #[arg(long, value_name = "N")]
    start: Option<usize>,
    /// Last page to convert (1-based, inclusive)
    #[arg(long, value_name = "N")]
    end: Option<usize>,
}

fn main() {
    env_logger::init();

    // Usage problems go to stdout with exit code 1, same as conversion errors
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{}", e.render());
            return;
        }
        Err(e) => {
            print!("{}", e.render());
            std::process::exit(1);
        }
    };

    if !args.input.exists() {
        println!("Error: file not found: {}", args.input.display());
        std::process::exit(1);
    }
    if !args.input.is_file() {
        println!("Error: not a file: {}", args.input.display());
        std::process::exit(1);
    }

    let options = ConvertOptions { start: args.start, end: args.end };
    let result = Converter::open(&args.input).and_then(|mut converter| {
        converter.convert(&args.output, &options)?;
        converter.close();
        Ok(())
    });

    match result {
        Ok(()) => println!("Conversion Successful"),
        Err(e) => {
            println!("Error: {e}");
            std::process::exit(1);
        }
    }
}
