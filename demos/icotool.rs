use clap::{App, Arg, SubCommand};
use std::fs;
use std::path::PathBuf;

//===========================================================================//

fn main() {
    env_logger::init();
    let matches = App::new("icotool")
        .version("0.1")
        .about("Inspects and extracts ICO files")
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extracts one icon from an ICO file as a PNG")
                .arg(
                    Arg::with_name("output")
                        .takes_value(true)
                        .value_name("PATH")
                        .short("o")
                        .long("output")
                        .help("Sets output path"),
                )
                .arg(Arg::with_name("ico").required(true))
                .arg(Arg::with_name("index").required(true)),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Lists icons in an ICO file")
                .arg(Arg::with_name("ico").required(true)),
        )
        .get_matches();
    if let Some(submatches) = matches.subcommand_matches("extract") {
        let path = submatches.value_of("ico").unwrap();
        let index = submatches.value_of("index").unwrap();
        let index = index.parse::<usize>().unwrap();
        let images = icodec::read_file(path).unwrap();
        let image = &images[index];
        let out_path = if let Some(path) = submatches.value_of("output") {
            PathBuf::from(path)
        } else {
            PathBuf::from(format!("{}.{}.png", path, index))
        };
        let out_file = fs::File::create(out_path).unwrap();
        let mut encoder =
            png::Encoder::new(out_file, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(image.rgba_data()).unwrap();
    } else if let Some(submatches) = matches.subcommand_matches("list") {
        let path = submatches.value_of("ico").unwrap();
        let images = icodec::read_file_ext(path).unwrap();
        for record in images.iter() {
            let kind = if record.is_png_compressed() { "PNG" } else { "BMP" };
            let bpp = match record.info_header() {
                Some(header) => format!("{} bpp", header.bit_count),
                None => String::from("- bpp"),
            };
            println!(
                "{:5}: {}x{} {}, {}",
                record.index(),
                record.image().width(),
                record.image().height(),
                kind,
                bpp
            );
        }
    }
}

//===========================================================================//
