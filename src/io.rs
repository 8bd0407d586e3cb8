//! Reading tree-sample files (plain or gzip) and writing TSV distance matrices.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::error::{Result, TreeDistError};

/// Text of one tree-sample file together with the identifier used to name
/// its trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSource {
    pub id: String,
    pub content: String,
}

impl TreeSource {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        TreeSource {
            id: id.into(),
            content: content.into(),
        }
    }
}

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

/// Read a BEAST/MrBayes tree file. Files ending in `.gz` are decompressed.
pub fn read_tree_source<P: AsRef<Path>>(path: P) -> Result<TreeSource> {
    let path = path.as_ref();
    let id = path.display().to_string();
    let io_err = |source: io::Error| TreeDistError::Io {
        path: id.clone(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut content = String::new();
    if is_gz(path) {
        MultiGzDecoder::new(file).read_to_string(&mut content)
    } else {
        io::BufReader::new(file).read_to_string(&mut content)
    }
    .map_err(io_err)?;

    Ok(TreeSource { id, content })
}

/// Write a labeled square matrix as TSV to a file or stdout.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the matrix is written to stdout (uncompressed).
pub fn write_matrix_tsv<P: AsRef<Path>, T: std::fmt::Display>(
    path: P,
    names: &[String],
    mat: &[Vec<T>],
) -> io::Result<()> {
    let p = path.as_ref();

    if p.as_os_str() == "-" {
        write_tsv(BufWriter::new(io::stdout().lock()), names, mat)
    } else if is_gz(p) {
        let mut enc = GzEncoder::new(BufWriter::new(File::create(p)?), Compression::default());
        write_tsv(&mut enc, names, mat)?;
        // The gzip trailer is only written by `finish`.
        enc.finish()?.flush()
    } else {
        write_tsv(BufWriter::new(File::create(p)?), names, mat)
    }
}

fn write_tsv<W: Write, T: std::fmt::Display>(mut out: W, names: &[String], mat: &[Vec<T>]) -> io::Result<()> {
    // Header row
    write!(&mut out, "\t")?;
    for (k, name) in names.iter().enumerate() {
        if k > 0 {
            write!(&mut out, "\t")?;
        }
        write!(&mut out, "{}", name)?;
    }
    writeln!(&mut out)?;

    // Rows
    for (name, row) in names.iter().zip(mat) {
        write!(&mut out, "{}", name)?;
        for val in row {
            write!(&mut out, "\t{}", val)?;
        }
        writeln!(&mut out)?;
    }

    out.flush()
}
