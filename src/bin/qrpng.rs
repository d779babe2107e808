use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::debug;
use qrpng::helper::to_text_string;
use qrpng::pipeline::deliver;
use qrpng::{
    encode_png, encode_symbol, EncodeMode, Error, ErrorLevel, Generated, Mask, OutputTarget,
    QrOptions, Rgb,
};

#[derive(Parser)]
#[command(name = "qrpng", version, about = "Encode text as a QR code PNG")]
struct Cli {
    /// Text to encode (ASCII)
    text: String,

    /// Error correction level: low, medium, high or max
    #[arg(short, long, default_value_t = ErrorLevel::Medium)]
    level: ErrorLevel,

    /// Output file
    #[arg(short, long, default_value = "qr.png", conflicts_with = "stdout")]
    output: PathBuf,

    /// Write the PNG to standard output instead of a file
    #[arg(long)]
    stdout: bool,

    /// Dark module color as R,G,B
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    color: Option<Vec<i32>>,

    /// Background color as R,G,B
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    background: Option<Vec<i32>>,

    /// Upper-case letters so more of the text fits alphanumeric mode
    #[arg(long)]
    case_insensitive: bool,

    /// Encode everything in byte mode
    #[arg(long)]
    byte: bool,

    /// Pixels per module
    #[arg(long, default_value_t = 1)]
    scale: u32,

    /// Quiet zone width in modules
    #[arg(long, default_value_t = 4)]
    margin: u32,

    /// Force a mask pattern instead of choosing the best one
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=7))]
    mask: Option<u8>,

    /// Also print the symbol to the terminal
    #[arg(long)]
    print: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("qrpng: {} (code {})", err, err.code().value());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> qrpng::Result<()> {
    let mut options = QrOptions::default()
        .with_level(cli.level)
        .with_case_sensitive(!cli.case_insensitive)
        .with_mode(if cli.byte { EncodeMode::Byte } else { EncodeMode::Auto })
        .with_scale(cli.scale)
        .with_quiet_zone(cli.margin)
        .with_mask(cli.mask.map(Mask::new));
    if let Some(color) = &cli.color {
        options = options.with_dark_color(Rgb::try_from(color.as_slice())?);
    }
    if let Some(background) = &cli.background {
        options = options.with_light_color(Rgb::try_from(background.as_slice())?);
    }
    options = options.with_target(if cli.stdout {
        OutputTarget::Memory
    } else {
        OutputTarget::File(cli.output.clone())
    });
    debug!("options: {:?}", options);

    let qr = encode_symbol(&cli.text, &options)?;
    if cli.print {
        // keep stdout clean for the PNG
        let text = to_text_string(&qr, text_border(options.quiet_zone)?);
        if cli.stdout {
            eprint!("{}", text);
        } else {
            print!("{}", text);
        }
    }

    let png = encode_png(&qr, &options)?;
    match deliver(png, &options.target)? {
        Generated::Bytes(png) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&png).map_err(Error::Write)?;
            stdout.flush().map_err(Error::Write)
        }
        Generated::File(path) => {
            eprintln!(
                "version {} ({}x{}), level {}, mask {} -> {}",
                qr.version(),
                qr.size(),
                qr.size(),
                qr.error_level(),
                qr.mask().value(),
                path.display()
            );
            Ok(())
        }
    }
}

/// The quiet zone as the signed border `to_text_string` takes.
fn text_border(quiet_zone: u32) -> qrpng::Result<i32> {
    i32::try_from(quiet_zone).map_err(|_| Error::InvalidRender("margin too large to print"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_border() {
        assert_eq!(text_border(4).unwrap(), 4);
        assert_eq!(text_border(i32::MAX as u32).unwrap(), i32::MAX);
        let err = text_border(u32::MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidRender(_)));
        assert_eq!(err.code(), qrpng::ResultCode::InitError);
    }

    #[test]
    fn test_parses_colors_and_margin() {
        let cli = Cli::try_parse_from([
            "qrpng",
            "hello",
            "--color",
            "10,20,30",
            "--margin",
            "4294967295",
            "--print",
        ])
        .unwrap();
        assert_eq!(cli.color, Some(vec![10, 20, 30]));
        assert_eq!(cli.margin, u32::MAX);
        assert!(text_border(cli.margin).is_err());
    }
}
