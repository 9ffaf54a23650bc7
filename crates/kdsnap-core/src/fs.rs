//! Size-capped file reading for key material

use std::io::Read;
use std::path::Path;

use crate::error::{KdsnapError, KdsnapResult};

/// Read a whole file, refusing anything larger than `limit` bytes.
///
/// The size is checked against the file metadata first and the read itself is
/// bounded too, so a file growing between the two steps is still rejected.
pub fn read_file_capped(path: &Path, limit: u64) -> KdsnapResult<Vec<u8>> {
    let read_err = |source| KdsnapError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::open(path).map_err(read_err)?;
    let size = file.metadata().map_err(read_err)?.len();
    if size > limit {
        return Err(KdsnapError::FileTooBig {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }

    let mut data = Vec::with_capacity(size as usize);
    file.take(limit + 1)
        .read_to_end(&mut data)
        .map_err(read_err)?;

    if data.len() as u64 > limit {
        return Err(KdsnapError::FileTooBig {
            path: path.to_path_buf(),
            size: data.len() as u64,
            limit,
        });
    }

    Ok(data)
}
