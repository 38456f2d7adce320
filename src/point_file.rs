use crate::error::{KMeansError, Result};
use crate::kmeans::Clustering;
use crate::point_store::{Point, PointStore};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::mem;
use std::path::Path;
use tracing::info;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

const POINT_FILE_MAGIC: u64 = u64::from_le_bytes(*b"KMPOINTS");
const POINT_FILE_VERSION: u32 = 1;

// Header at the start of the file
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Debug, Clone, Copy)]
struct PointFileHeader {
    magic: u64,
    version: u32,
    point_count: u32,
} // 16 bytes, followed by `point_count` packed points

/// Writes `points` in the binary point-file format.
pub fn write_points<P: AsRef<Path>>(path: P, points: &[Point]) -> Result<()> {
    let path = path.as_ref();
    let point_count = u32::try_from(points.len())
        .map_err(|_| KMeansError::format("too many points for a point file"))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let header = PointFileHeader {
        magic: POINT_FILE_MAGIC,
        version: POINT_FILE_VERSION,
        point_count,
    };

    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(header.as_bytes())?;
    file.write_all(points.as_bytes())?;
    file.flush()?;

    info!("Wrote {} points to {}", points.len(), path.display());
    Ok(())
}

/// Reads a point file written by [`write_points`].
pub fn read_points<P: AsRef<Path>>(path: P) -> Result<PointStore> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let header_size = mem::size_of::<PointFileHeader>();
    if (file.metadata()?.len() as usize) < header_size {
        return Err(KMeansError::format("point file is shorter than its header"));
    }
    let mmap = unsafe { Mmap::map(&file)? };

    let (header, body) = PointFileHeader::read_from_prefix(&mmap[..])
        .map_err(|_| KMeansError::format("invalid point file header"))?;
    if header.magic != POINT_FILE_MAGIC {
        return Err(KMeansError::format("not a point file"));
    }
    if header.version != POINT_FILE_VERSION {
        return Err(KMeansError::format(format!(
            "unsupported point file version {}",
            header.version
        )));
    }

    let expected = header.point_count as usize * mem::size_of::<Point>();
    if body.len() != expected {
        return Err(KMeansError::format(format!(
            "point file body holds {} bytes, header declares {}",
            body.len(),
            expected
        )));
    }
    let points = <[Point]>::ref_from_bytes(body)
        .map_err(|e| KMeansError::format(format!("invalid point data: {}", e)))?
        .to_vec();

    info!("Read {} points from {}", points.len(), path.display());
    Ok(PointStore::new(points))
}

/// Persists a clustering result (centroids, labels and run summary).
pub fn save_clustering<P: AsRef<Path>>(path: P, clustering: &Clustering) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let encoded = bincode::serde::encode_to_vec(clustering, bincode::config::standard())
        .map_err(|e| KMeansError::format(format!("bincode encoding error: {}", e)))?;

    let mut file = File::create(path)?;
    file.write_all(&encoded)?;
    info!(
        "Clustering written to {} ({} bytes)",
        path.display(),
        encoded.len()
    );
    Ok(())
}

pub fn load_clustering<P: AsRef<Path>>(path: P) -> Result<Clustering> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    let (clustering, _bytes_read): (Clustering, _) =
        bincode::serde::decode_from_slice(&buffer, bincode::config::standard())
            .map_err(|e| KMeansError::format(format!("bincode decoding error: {}", e)))?;
    Ok(clustering)
}
