use std::{fs::File, io, os::fd::AsRawFd, slice::from_raw_parts};

use crate::source::ByteSource;

/// A read-only, private mapping of a whole file.
pub struct MappedFile {
    ptr: *const u8,
    len: usize,
}

// The mapping is never written to and lives until drop.
unsafe impl Send for MappedFile {}
unsafe impl Sync for MappedFile {}

impl MappedFile {
    pub fn map(file: &File) -> io::Result<Self> {
        let len = usize::try_from(file.metadata()?.len())
            .map_err(|_| io::Error::new(io::ErrorKind::Unsupported, "file too large to map"))?;
        if len == 0 {
            // mmap rejects zero-length mappings
            return Ok(Self {
                ptr: std::ptr::NonNull::<u8>::dangling().as_ptr(),
                len,
            });
        }
        match unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                0,
            )
        } {
            libc::MAP_FAILED => Err(io::Error::last_os_error()),
            ptr => {
                unsafe { libc::madvise(ptr, len, libc::MADV_SEQUENTIAL) };
                Ok(Self {
                    ptr: ptr as *const u8,
                    len,
                })
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { from_raw_parts(self.ptr, self.len) }
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        if self.len != 0 {
            unsafe {
                libc::munmap(self.ptr as *mut libc::c_void, self.len);
            }
        }
    }
}

impl ByteSource for MappedFile {
    fn size(&self) -> io::Result<u64> {
        Ok(self.len as u64)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_bytes().read_at(buf, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_map_and_read() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"Lima;19.0\nRome;-1.5\n").unwrap();

        let mapped = MappedFile::map(&file).unwrap();
        assert_eq!(mapped.size().unwrap(), 20);
        assert_eq!(&mapped.as_bytes()[10..14], b"Rome");

        let mut buf = [0u8; 64];
        assert_eq!(mapped.read_at(&mut buf, 15).unwrap(), 5);
        assert_eq!(&buf[..5], b"-1.5\n");
    }

    #[test]
    fn test_map_empty_file() {
        let file = tempfile::tempfile().unwrap();
        let mapped = MappedFile::map(&file).unwrap();
        assert!(mapped.as_bytes().is_empty());
        let mut buf = [0u8; 8];
        assert_eq!(mapped.read_at(&mut buf, 0).unwrap(), 0);
    }
}
