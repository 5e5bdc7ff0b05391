//! Standalone extractor: recover embedded PDF reports from saved ECG XML.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use ecg_upload_server::error::UploadError;
use ecg_upload_server::extract::{extract, ExtractionOutcome};
use ecg_upload_server::observability::logging;
use ecg_upload_server::storage::{store, StoredFile};

#[derive(Parser)]
#[command(name = "ecg-extract")]
#[command(about = "Extract embedded PDF reports from ECG XML files", long_about = None)]
struct Cli {
    /// XML files to process.
    files: Vec<PathBuf>,

    /// Process every .xml file in this directory [default: ftp_data when no
    /// files are given].
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Log level for diagnostics on stderr.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

const DEFAULT_DIR: &str = "ftp_data";

enum Processed {
    Extracted(StoredFile),
    NoPdf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let dir = scan_dir(&cli.files, cli.dir);
    let mut files = cli.files;
    if let Some(dir) = &dir {
        match xml_files_in(dir) {
            Ok(found) => files.extend(found),
            Err(e) => {
                eprintln!("Error: cannot read {}: {}", dir.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }
    if files.is_empty() {
        eprintln!("Error: no XML files found (pass paths or --dir)");
        return ExitCode::FAILURE;
    }

    let mut failed = 0usize;
    for file in &files {
        match process_file(file) {
            Ok(Processed::Extracted(stored)) => println!(
                "[OK]    {} -> {} ({} bytes)",
                file.display(),
                stored.destination_path.display(),
                stored.byte_length
            ),
            Ok(Processed::NoPdf) => println!("[SKIP]  {}: no embedded PDF", file.display()),
            Err(e) => {
                failed += 1;
                println!("[ERROR] {}: {}", file.display(), e);
            }
        }
    }

    println!("{} file(s) processed, {} failed", files.len(), failed);
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Directory to scan: the one asked for, else the server's default output
/// directory when no files were named.
fn scan_dir(files: &[PathBuf], dir: Option<PathBuf>) -> Option<PathBuf> {
    dir.or_else(|| files.is_empty().then(|| PathBuf::from(DEFAULT_DIR)))
}

fn xml_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Extract one file's PDF next to it as `<stem>_extracted.pdf`.
fn process_file(path: &Path) -> Result<Processed, Box<dyn std::error::Error>> {
    let data = fs::read(path)?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "Inspecting");

    match extract(data).into_parts().0 {
        ExtractionOutcome::PdfFound(pdf) => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "report".to_string());
            let directory = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let stored = store(&format!("{stem}_extracted.pdf"), &pdf, directory).map_err(UploadError::from)?;
            Ok(Processed::Extracted(stored))
        }
        ExtractionOutcome::NoPdfPresent => Ok(Processed::NoPdf),
        ExtractionOutcome::MalformedInput(e) => Err(UploadError::from(e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_scans_default_directory() {
        assert_eq!(scan_dir(&[], None), Some(PathBuf::from("ftp_data")));
    }

    #[test]
    fn explicit_files_skip_default_directory() {
        assert_eq!(scan_dir(&[PathBuf::from("a.xml")], None), None);
        assert_eq!(
            scan_dir(&[PathBuf::from("a.xml")], Some(PathBuf::from("in"))),
            Some(PathBuf::from("in"))
        );
    }

    #[test]
    fn directory_scan_picks_xml_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.XML"), b"<a/>").unwrap();
        fs::write(dir.path().join("a.xml"), b"<a/>").unwrap();
        fs::write(dir.path().join("c.pdf"), b"%PDF").unwrap();

        let found = xml_files_in(dir.path()).unwrap();
        let names: Vec<_> = found.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
        assert_eq!(names, vec!["a.xml", "b.XML"]);
    }
}
