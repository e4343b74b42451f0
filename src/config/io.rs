use std::env::current_exe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use directories_next::ProjectDirs;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use serde_json;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::OpenOptions;
use std::str;

use crate::config::types::Config;
use crate::error::ConfigError;

// creates a path to a config file in the same directory as the executable
// this could be useful for usb sticks
fn get_portable_config_path() -> Option<PathBuf> {
    match current_exe() {
        Ok(mut path) => {
            // F:\foo.exe => F:\foo.json
            if !path.set_extension("json") {
                eprintln!("current exe has no filename: {}", path.to_string_lossy());
                return None
            }

            Some(path)
        },
        Err(err) => {
            eprintln!("failed to get current exe path: {:?}", err);
            None
        },
    }
}

// creates a path to headset-companion.json in an os dependent standard directory, such as
// %AppData% on windows.
fn get_local_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "headset", "headset-companion").map(|dirs| {
        dirs.config_dir().join("headset-companion.json")
    })
}

fn get_config_path() -> Result<PathBuf, ConfigError> {
    let portable = get_portable_config_path();
    if let Some(path) = portable {
        let attr = std::fs::metadata(&path);
        match attr {
            Ok(attr) => {
                if attr.is_file() {
                    return Ok(path);
                }
            }
            Err(err) => {
                eprintln!("Could not read metadata of: {}; Using local path instead. ({:?})", path.to_string_lossy(), err);
            },
        }

    }

    match get_local_config_path() {
        None => Err(ConfigError::NoConfigPath),
        Some(path) => Ok(path),
    }
}

pub struct ConfigIOLocker {
    rw_lock: RwLock<std::fs::File>,
}

impl ConfigIOLocker {
    pub fn lock(&mut self) -> Result<RwLockWriteGuard<'_, std::fs::File>, ConfigError> {
        match self.rw_lock.try_write() {
            Ok(guard) => Ok(guard),
            Err(source) =>{
                return Err(ConfigError::CanNotLock { source });
            },
        }
    }
}

struct ConfigIOInner {
    file: std::fs::File,
}

#[derive(Clone)]
pub struct ConfigIO {
    inner: Arc<Mutex<ConfigIOInner>>,
}

impl ConfigIO {
    pub fn new_sync() -> Result<Self, ConfigError> {
        let path = get_config_path()?;
        ConfigIO::from_path(&path)
    }

    // opens (or creates) the config file at an explicit location, for the
    // --config command line option
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        println!("Using config file {}", path.to_string_lossy());

        if let Some(directory) = path.parent() {
            if !directory.as_os_str().is_empty() {
                std::fs::create_dir_all(directory)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .append(false)
            .create(true)
            .open(path)?;

        let inner = ConfigIOInner {
            file,
        };
        Ok(ConfigIO { inner: Arc::new(Mutex::new(inner)) })
    }

    // an exclusive file lock so that the config file is written by only one
    // instance of this application at a time
    pub fn locker(&mut self) -> Result<ConfigIOLocker, ConfigError> {
        let inner = self.inner.lock().expect("Failed to lock ConfigIO inner");

        Ok(ConfigIOLocker {
            rw_lock: RwLock::new(inner.file.try_clone()?),
        })
    }

    // The File returned from here should never be closed!
    fn get_file(&self) -> Result<File, ConfigError> {
        let inner = self.inner.lock().expect("Failed to lock ConfigIO inner");
        let file = inner.file.try_clone()?; // std File
        Ok(File::from_std(file)) // tokio File
    }

    pub async fn read(&self) -> Result<Config, ConfigError> {
        let mut file = self.get_file()?;
        println!("Reading config file");

        // cloned handles share a cursor, start from the top every time
        file.rewind().await?;

        let mut content = vec![];
        file.read_to_end(&mut content).await?;

        if content.is_empty() {
            return Ok(Config::default());
        }

        let content = str::from_utf8(&content)?;

        let config: Config = serde_json::from_str(content)?;
        Ok(config)
    }

    pub async fn save(&self, config: Config) -> Result<(), ConfigError> {
        let mut file = self.get_file()?;
        println!("Saving config");

        let content = serde_json::to_string_pretty(&config)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_defaults_from_a_new_file() {
        let dir = tempdir().expect("should create a temp dir");
        let config_io = ConfigIO::from_path(&dir.path().join("headset-companion.json"))
            .expect("should open a fresh config file");

        let config = config_io.read().await.expect("an empty file should read as defaults");
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn saves_and_reads_back() {
        let dir = tempdir().expect("should create a temp dir");
        let config_io = ConfigIO::from_path(&dir.path().join("headset-companion.json"))
            .expect("should open a fresh config file");

        let config = Config {
            port: Some(String::from("/dev/rfcomm3")),
            baud_rate: 57600,
        };
        config_io.save(config.clone()).await.expect("save should succeed");

        let read_back = config_io.read().await.expect("read should succeed");
        assert_eq!(read_back, config);

        // a second save with shorter content must fully replace the previous one
        config_io.save(Config::default()).await.expect("second save should succeed");
        let read_back = config_io.read().await.expect("second read should succeed");
        assert_eq!(read_back, Config::default());
    }

    #[tokio::test]
    async fn rejects_a_second_locker() {
        let dir = tempdir().expect("should create a temp dir");
        let path = dir.path().join("headset-companion.json");

        let mut first = ConfigIO::from_path(&path).expect("should open the config file");
        let mut first_locker = first.locker().expect("should create a locker");
        let _guard = first_locker.lock().expect("first lock should succeed");

        let mut second = ConfigIO::from_path(&path).expect("should open the config file again");
        let mut second_locker = second.locker().expect("should create a second locker");
        match second_locker.lock() {
            Err(ConfigError::CanNotLock { .. }) => {},
            other => panic!("expected CanNotLock, got {:?}", other.map(|_| ())),
        };
    }
}
