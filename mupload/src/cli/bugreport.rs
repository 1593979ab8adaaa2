use bugreport::{
    bugreport,
    collector::{CompileTimeInformation, EnvironmentVariables, OperatingSystem, SoftwareVersion},
    format::Markdown,
};

pub fn run() {
    bugreport!()
        .info(SoftwareVersion::default())
        .info(OperatingSystem::default())
        .info(EnvironmentVariables::list(&[
            "SHELL",
            "TERM",
            "RUST_LOG",
            super::URI_ENV,
            "MUPLOAD_DEFAULT_BUCKET",
            "MUPLOAD_MAX_CONCURRENCY",
            "MUPLOAD_MAX_FILE_SIZE",
            "MUPLOAD_CHUNK_SIZE",
        ]))
        .info(CompileTimeInformation::default())
        .print::<Markdown>();
}
