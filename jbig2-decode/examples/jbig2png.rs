//! This example shows you how to convert a JBIG2 image into a PNG file.
//!
//! Embedded streams, for example ones extracted from a PDF file, can be
//! converted by passing the stream and optionally its global segments.

#![allow(missing_docs)]

use std::process::ExitCode;

fn read(path: &str) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(data) => Some(data),
        Err(err) => {
            eprintln!("Failed to read {path}: {err}");

            None
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let (input_path, output_path, embedded, globals_path) = match args.as_slice() {
        [_, input, output] => (input, output, false, None),
        [_, flag, input, output] if flag == "--embedded" => (input, output, true, None),
        [_, flag, input, globals, output] if flag == "--embedded" => {
            (input, output, true, Some(globals))
        }
        _ => {
            eprintln!(
                "Usage: {} [--embedded] <input.jbig2> [globals.jbig2] <output.png>",
                args[0]
            );

            return ExitCode::FAILURE;
        }
    };

    let Some(data) = read(input_path) else {
        return ExitCode::FAILURE;
    };

    let globals = match globals_path {
        Some(path) => match read(path) {
            Some(globals) => Some(globals),
            None => return ExitCode::FAILURE,
        },
        None => None,
    };

    let result = if embedded {
        jbig2_decode::decode_embedded(&data, globals.as_deref())
    } else {
        jbig2_decode::decode(&data)
    };

    let bitmap = match result {
        Ok(bitmap) => bitmap,
        Err(err) => {
            eprintln!("Failed to decode JBIG2: {err}");

            return ExitCode::FAILURE;
        }
    };

    println!("Decoded: {}x{} image", bitmap.width(), bitmap.height());

    if let Err(err) = bitmap.to_luma8().save(output_path) {
        eprintln!("Failed to save PNG: {err}");

        return ExitCode::FAILURE;
    }

    eprintln!("Saved: {output_path}");

    ExitCode::SUCCESS
}
