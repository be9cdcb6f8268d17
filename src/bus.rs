/* Two-wire bus transport: the Bus/Wire trait seam consumed by the driver core,
 * plus the Linux /dev/i2c-N implementation used on real hardware. */
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use async_trait::async_trait;
use nix::libc;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/* Domain-specific error variants for all bus I/O operations. */
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Failed to open bus device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Slave address ioctl failed: {0}")]
    IoctlFailed(std::io::Error),
}

/* Opens numbered bus channels. The driver core holds a Bus and opens */
/* a Wire on enable; the wire lives exactly as long as the device is  */
/* enabled.                                                           */
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    type Wire: Wire;

    async fn open(&self, channel: u32) -> Result<Self::Wire, BusError>;
}

/* An open bus channel. All register traffic goes through this trait  */
/* so the driver core never touches device nodes directly.            */
/*  */
/* Single-byte and block reads keep distinct call shapes on purpose:  */
/* the underlying primitives differ, and callers must not assume a    */
/* uniform buffer shape across lengths.                               */
#[async_trait]
pub trait Wire: Send + 'static {
    async fn write_byte(&mut self, address: u16, register: u8, byte: u8) -> Result<(), BusError>;

    async fn read_byte(&mut self, address: u16, register: u8) -> Result<u8, BusError>;

    async fn read_block(
        &mut self,
        address: u16,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), BusError>;
}

/* Linux i2c-dev ioctl selecting the slave address for subsequent     */
/* read(2)/write(2) calls (linux/i2c-dev.h).                          */
const I2C_SLAVE: libc::c_ulong = 0x0703;

/* Factory for /dev/i2c-N channels. */
#[derive(Debug, Clone, Copy, Default)]
pub struct I2cBus;

#[async_trait]
impl Bus for I2cBus {
    type Wire = I2cWire;

    async fn open(&self, channel: u32) -> Result<I2cWire, BusError> {
        let path = PathBuf::from(format!("/dev/i2c-{channel}"));
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .await
            .map_err(|source| BusError::Open {
                path: path.display().to_string(),
                source,
            })?;

        debug!("Opened {}", path.display());

        Ok(I2cWire {
            file,
            path,
            slave_address: None,
        })
    }
}

/* Async wrapper around an open /dev/i2c-N file descriptor. */
pub struct I2cWire {
    file: tokio::fs::File,
    path: PathBuf,
    /* Last address selected via I2C_SLAVE; re-issued only on change. */
    slave_address: Option<u16>,
}

impl I2cWire {
    /* Select the slave the next read/write will address. */
    fn set_slave_address(&mut self, address: u16) -> Result<(), BusError> {
        if self.slave_address == Some(address) {
            return Ok(());
        }

        let fd = self.file.as_raw_fd();

        /* SAFETY: `fd` is a valid open file descriptor for the lifetime */
        /* of this call. I2C_SLAVE takes the address by value; no memory */
        /* is read or written through a pointer.                         */
        let res = unsafe { libc::ioctl(fd, I2C_SLAVE, libc::c_ulong::from(address)) };

        if res < 0 {
            return Err(BusError::IoctlFailed(std::io::Error::last_os_error()));
        }

        self.slave_address = Some(address);
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> BusError {
        BusError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /* Write the register offset, leaving the device pointed at it for */
    /* the read that follows.                                          */
    async fn select_register(&mut self, register: u8) -> Result<(), BusError> {
        self.file
            .write_all(&[register])
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

#[async_trait]
impl Wire for I2cWire {
    async fn write_byte(&mut self, address: u16, register: u8, byte: u8) -> Result<(), BusError> {
        self.set_slave_address(address)?;
        self.file
            .write_all(&[register, byte])
            .await
            .map_err(|e| self.io_error(e))?;
        debug!("TX reg {register:#04x}: {byte:#04x}");
        Ok(())
    }

    async fn read_byte(&mut self, address: u16, register: u8) -> Result<u8, BusError> {
        self.set_slave_address(address)?;
        self.select_register(register).await?;

        let mut buf = [0u8; 1];
        self.file
            .read_exact(&mut buf)
            .await
            .map_err(|e| self.io_error(e))?;
        debug!("RX reg {register:#04x}: {:#04x}", buf[0]);
        Ok(buf[0])
    }

    async fn read_block(
        &mut self,
        address: u16,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), BusError> {
        self.set_slave_address(address)?;
        self.select_register(register).await?;

        self.file
            .read_exact(buf)
            .await
            .map_err(|e| self.io_error(e))?;
        debug!("RX {} bytes from reg {register:#04x}: {buf:02x?}", buf.len());
        Ok(())
    }
}
