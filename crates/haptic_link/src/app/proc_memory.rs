use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use haptic_engine::{HostHandle, MemoryAccess, MemoryError, ProcessRef, ReadRequest};

const PROC_ROOT: &str = "/proc";
/// The kernel truncates `comm` to 15 bytes.
const COMM_MAX_LEN: usize = 15;

/// Reads another process's memory through procfs. The handle is the pid.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ProcMemory;

#[async_trait]
impl MemoryAccess for ProcMemory {
    async fn list_processes(&self, name: &str) -> Result<Vec<ProcessRef>, MemoryError> {
        let wanted = name.to_string();
        let listing = tokio::task::spawn_blocking(move || list_matching(Path::new(PROC_ROOT), &wanted))
            .await
            .map_err(|error| MemoryError::Backend(error.to_string()))?;
        listing.map_err(|source| MemoryError::Lookup {
            name: name.to_string(),
            source,
        })
    }

    async fn read(&self, handle: HostHandle, request: ReadRequest) -> Result<Vec<u8>, MemoryError> {
        let address = request.effective_address()?;
        let len = request.byte_len();
        let path = mem_path(handle);
        tokio::task::spawn_blocking(move || read_at(&path, address, len))
            .await
            .map_err(|error| MemoryError::Backend(error.to_string()))?
            .map_err(|source| MemoryError::Read {
                address,
                len,
                source,
            })
    }
}

fn mem_path(handle: HostHandle) -> PathBuf {
    Path::new(PROC_ROOT).join(handle.0.to_string()).join("mem")
}

fn list_matching(proc_root: &Path, name: &str) -> io::Result<Vec<ProcessRef>> {
    let mut matches = Vec::new();
    for entry in fs::read_dir(proc_root)? {
        let entry = entry?;
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|raw| raw.parse::<u64>().ok())
        else {
            continue;
        };
        // Processes exit between listing and reading; skip them.
        let comm = fs::read_to_string(entry.path().join("comm")).unwrap_or_default();
        let cmdline = fs::read(entry.path().join("cmdline")).unwrap_or_default();
        if process_matches(name, comm.trim_end(), &cmdline) {
            matches.push(ProcessRef {
                name: name.to_string(),
                handle: HostHandle(pid),
            });
        }
    }
    matches.sort_by_key(|process| process.handle.0);
    Ok(matches)
}

fn process_matches(name: &str, comm: &str, cmdline: &[u8]) -> bool {
    if name.is_empty() {
        return false;
    }
    let argv0 = cmdline.split(|byte| *byte == 0).next().unwrap_or_default();
    let argv0 = String::from_utf8_lossy(argv0);
    let base = argv0.rsplit(['/', '\\']).next().unwrap_or_default();
    if base == name {
        return true;
    }
    let truncated = name.get(..COMM_MAX_LEN).unwrap_or(name);
    !comm.is_empty() && comm == truncated
}

#[cfg(unix)]
fn read_at(path: &Path, address: u64, len: usize) -> io::Result<Vec<u8>> {
    use std::os::unix::fs::FileExt;

    let file = File::open(path)?;
    let mut buffer = vec![0u8; len];
    file.read_exact_at(&mut buffer, address)?;
    Ok(buffer)
}

#[cfg(not(unix))]
fn read_at(path: &Path, _address: u64, _len: usize) -> io::Result<Vec<u8>> {
    let _ = File::open(path)?;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "procfs memory reads need a unix host",
    ))
}
