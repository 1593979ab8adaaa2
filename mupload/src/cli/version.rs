use std::env;

use client::UploadOptions;

pub fn run() {
    let options = UploadOptions::from_env();
    let max_file_size = options
        .max_file_size
        .map_or_else(|| "unlimited".to_owned(), |limit| format!("{limit} bytes"));

    let rows = [
        ("Name", clap::crate_name!().to_owned()),
        ("Version", clap::crate_version!().to_owned()),
        ("OS", env::consts::OS.to_owned()),
        ("Architecture", env::consts::ARCH.to_owned()),
        ("Default bucket", options.default_bucket),
        ("Concurrency", options.max_concurrency.to_string()),
        ("Chunk size", format!("{} bytes", options.chunk_size)),
        ("Max file size", max_file_size),
    ];
    for (key, value) in rows {
        println!("{key:<15}: {value}");
    }
}
