/* Driver core for the PIM447 trackball: chip identity verification on enable,
 * guarded register I/O while the device is off, the RGBW illuminator, and the
 * timer-driven polling loop that turns motion/click registers into events. */
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::bus::{Bus, I2cBus, Wire};
use crate::color::RgbwColor;
use crate::error::TrackballError;
use crate::events::EventRegistry;
use crate::input::InputSample;
use crate::registers;
use crate::registers::INPUT_BLOCK_LEN;

/* Bus channel used when none is given (`/dev/i2c-1` on a Raspberry Pi). */
pub const DEFAULT_CHANNEL: u32 = 1;

/* Poll period used by `enable` when the caller does not pick one. */
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 50;

/* How the two identity bytes are interpreted. Resolved once from the    */
/* target platform at construction instead of being an implicit global.  */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /* The byte order of the platform this crate was built for. */
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    fn read_u16(self, raw: [u8; 2]) -> u16 {
        match self {
            Self::Big => u16::from_be_bytes(raw),
            Self::Little => u16::from_le_bytes(raw),
        }
    }
}

/* Outcome of a guarded register access.                                 */
/*  */
/* `Skipped` means the device was off and the transport was never        */
/* touched. It is not an error: tooling and tests may legitimately poke  */
/* registers before enabling.                                            */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guarded<T> {
    Done(T),
    Skipped,
}

impl<T> Guarded<T> {
    /* The value of a performed access, or `None` when skipped. */
    pub fn performed(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/* State shared between the caller-facing handle and the polling task.   */
/* The wire is present iff the device is enabled.                        */
struct Shared<W: Wire> {
    address: u16,
    enabled: bool,
    wire: Option<W>,
    color: RgbwColor,
    contrast: u8,
    chip_id: Option<u16>,
}

impl<W: Wire> Shared<W> {
    async fn write_register(
        &mut self,
        register: u8,
        byte: u8,
    ) -> Result<Guarded<()>, TrackballError> {
        let address = self.address;
        let Some(wire) = self.wire.as_mut() else {
            warn!("write_register skipped: trackball is turned off");
            return Ok(Guarded::Skipped);
        };
        wire.write_byte(address, register, byte).await?;
        Ok(Guarded::Done(()))
    }

    async fn read_register(&mut self, register: u8) -> Result<Guarded<u8>, TrackballError> {
        let address = self.address;
        let Some(wire) = self.wire.as_mut() else {
            warn!("read_register skipped: trackball is turned off");
            return Ok(Guarded::Skipped);
        };
        let byte = wire.read_byte(address, register).await?;
        Ok(Guarded::Done(byte))
    }

    async fn read_block<const N: usize>(
        &mut self,
        register: u8,
    ) -> Result<Guarded<[u8; N]>, TrackballError> {
        let address = self.address;
        let Some(wire) = self.wire.as_mut() else {
            warn!("read_block skipped: trackball is turned off");
            return Ok(Guarded::Skipped);
        };
        let mut buf = [0u8; N];
        wire.read_block(address, register, &mut buf).await?;
        Ok(Guarded::Done(buf))
    }

    /* Write all four LED registers from the stored colour and contrast. */
    /*  */
    /* The scale collapses to zero when no channel is set so that "no    */
    /* colour" and "zero contrast" drive the hardware identically.       */
    async fn apply_color(&mut self) -> Result<Guarded<()>, TrackballError> {
        let color = self.color;
        let scale = if color.channel_sum() == 0 {
            0.0
        } else {
            f64::from(self.contrast) / 255.0
        };
        let level = |channel: u8| (f64::from(channel) * scale).round() as u8;

        let channels = [
            (registers::REG_LED_RED, level(color.r)),
            (registers::REG_LED_GRN, level(color.g)),
            (registers::REG_LED_BLU, level(color.b)),
            (registers::REG_LED_WHT, level(color.w)),
        ];

        for (register, value) in channels {
            if self.write_register(register, value).await?.is_skipped() {
                return Ok(Guarded::Skipped);
            }
        }
        Ok(Guarded::Done(()))
    }

    async fn read_inputs(&mut self) -> Result<Guarded<InputSample>, TrackballError> {
        match self.read_block::<INPUT_BLOCK_LEN>(registers::REG_LEFT).await? {
            Guarded::Done(raw) => Ok(Guarded::Done(InputSample::from_raw(raw))),
            Guarded::Skipped => Ok(Guarded::Skipped),
        }
    }
}

/* One physical trackball on a numbered bus channel.                     */
/*  */
/* All bus traffic is sequential: the polling task and caller-invoked    */
/* operations serialise on one async mutex, so at most one transaction   */
/* is in flight at any time.                                             */
pub struct Trackball<B: Bus> {
    bus: B,
    channel: u32,
    byte_order: ByteOrder,
    refresh_interval_ms: u64,
    shared: Arc<Mutex<Shared<B::Wire>>>,
    events: Arc<StdMutex<EventRegistry>>,
    poll_task: Option<JoinHandle<()>>,
}

impl Trackball<I2cBus> {
    /* Handle for the primary address on the default channel. */
    pub fn new() -> Self {
        Self::with_bus(I2cBus, DEFAULT_CHANNEL, registers::I2C_ADDR_PRIMARY)
    }

    pub fn with_address(channel: u32, address: u16) -> Self {
        Self::with_bus(I2cBus, channel, address)
    }
}

impl Default for Trackball<I2cBus> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Bus> Trackball<B> {
    /* Handle over an arbitrary transport, for platforms other than      */
    /* Linux i2c-dev and for tests.                                      */
    pub fn with_bus(bus: B, channel: u32, address: u16) -> Self {
        Self {
            bus,
            channel,
            byte_order: ByteOrder::native(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            shared: Arc::new(Mutex::new(Shared {
                address,
                enabled: false,
                wire: None,
                color: RgbwColor::default(),
                contrast: 0,
                chip_id: None,
            })),
            events: Arc::new(StdMutex::new(EventRegistry::default())),
            poll_task: None,
        }
    }

    /* Override the byte order used to interpret the identity registers. */
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub async fn address(&self) -> u16 {
        self.shared.lock().await.address
    }

    pub async fn is_enabled(&self) -> bool {
        self.shared.lock().await.enabled
    }

    /* Chip id read during the last successful enable. */
    pub async fn chip_id(&self) -> Option<u16> {
        self.shared.lock().await.chip_id
    }

    pub async fn color(&self) -> RgbwColor {
        self.shared.lock().await.color
    }

    pub async fn contrast(&self) -> u8 {
        self.shared.lock().await.contrast
    }

    pub fn refresh_interval(&self) -> u64 {
        self.refresh_interval_ms
    }

    /* Register a listener for state-update events. Listeners run        */
    /* synchronously, in registration order, once per emitted sample.    */
    pub fn on_state_update(&self, listener: impl Fn(&InputSample) + Send + 'static) {
        self.events.lock().unwrap().on_state_update(Box::new(listener));
    }

    /* Register a listener for poll-cycle errors. Without one, poll      */
    /* failures are only logged.                                         */
    pub fn on_error(&self, listener: impl Fn(&TrackballError) + Send + 'static) {
        self.events.lock().unwrap().on_error(Box::new(listener));
    }

    /* Turn the trackball on with the default refresh interval. */
    pub async fn enable(&mut self) -> Result<(), TrackballError> {
        self.enable_with_interval(DEFAULT_REFRESH_INTERVAL_MS).await
    }

    /* Turn the trackball on: open the bus channel, verify the chip      */
    /* identity before any other register access, then start polling at  */
    /* `refresh_interval_ms`.                                            */
    /*  */
    /* On an identity mismatch the wire is dropped, the enabled flag     */
    /* stays clear, and the handle remains usable for a retry.           */
    pub async fn enable_with_interval(
        &mut self,
        refresh_interval_ms: u64,
    ) -> Result<(), TrackballError> {
        {
            let mut shared = self.shared.lock().await;

            let mut wire = self.bus.open(self.channel).await?;
            let mut raw = [0u8; 2];
            wire.read_block(shared.address, registers::REG_CHIP_ID_L, &mut raw)
                .await?;

            let chip_id = self.byte_order.read_u16(raw);
            if chip_id != registers::CHIP_ID {
                return Err(TrackballError::DeviceNotFound { chip_id });
            }

            shared.wire = Some(wire);
            shared.enabled = true;
            shared.chip_id = Some(chip_id);
        }

        info!(
            "Trackball enabled on channel {} (chip id {:#06x})",
            self.channel,
            registers::CHIP_ID
        );
        self.set_refresh_interval(refresh_interval_ms).await;
        Ok(())
    }

    /* Turn the trackball off: stop polling, blank all four LED channels */
    /* by driving contrast to zero, then release the wire.               */
    /*  */
    /* The enabled flag is cleared and the wire dropped even when the    */
    /* blank-out write fails; the failure is still reported afterwards.  */
    pub async fn disable(&mut self) -> Result<(), TrackballError> {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }

        let blanked = {
            let mut shared = self.shared.lock().await;
            shared.contrast = 0;
            let blanked = shared.apply_color().await;
            shared.enabled = false;
            shared.wire = None;
            blanked
        };

        info!("Trackball disabled");
        blanked?;
        Ok(())
    }

    /* Replace the poll schedule: the previous task is cancelled before  */
    /* the new one is armed, and the first poll fires one full period    */
    /* from now. While the device is off only the value is stored;       */
    /* enable arms the loop.                                             */
    pub async fn set_refresh_interval(&mut self, refresh_interval_ms: u64) {
        self.refresh_interval_ms = refresh_interval_ms;

        if let Some(task) = self.poll_task.take() {
            task.abort();
        }

        if !self.shared.lock().await.enabled {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let events = Arc::clone(&self.events);
        let period = Duration::from_millis(refresh_interval_ms.max(1));

        self.poll_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let outcome = shared.lock().await.read_inputs().await;
                match outcome {
                    Ok(Guarded::Done(sample)) if sample.state_update => {
                        events.lock().unwrap().emit_state_update(&sample);
                    }
                    Ok(_) => {}
                    Err(error) => {
                        /* A failed cycle never stops the schedule. */
                        let error = match error {
                            TrackballError::Bus(source) => TrackballError::Poll(source),
                            other => other,
                        };
                        let registry = events.lock().unwrap();
                        if registry.has_error_listeners() {
                            registry.emit_error(&error);
                        } else {
                            warn!("Poll cycle failed: {error}");
                        }
                    }
                }
            }
        }));
    }

    /* Store the colour and rewrite all four LED registers. Writes       */
    /* always happen, even for unchanged values, to keep the hardware in */
    /* step with the stored model.                                       */
    pub async fn set_color(&mut self, color: RgbwColor) -> Result<Guarded<()>, TrackballError> {
        let mut shared = self.shared.lock().await;
        shared.color = color;
        shared.apply_color().await
    }

    /* Store the contrast and re-issue the stored colour so only the     */
    /* brightness changes, not the hue.                                  */
    pub async fn set_contrast(&mut self, value: u8) -> Result<Guarded<()>, TrackballError> {
        let mut shared = self.shared.lock().await;
        shared.contrast = value;
        shared.apply_color().await
    }

    /* One on-demand poll cycle: read the motion/click block, emit a     */
    /* state-update event if the sample warrants one, and return it.     */
    pub async fn read_inputs(&mut self) -> Result<Guarded<InputSample>, TrackballError> {
        let outcome = self.shared.lock().await.read_inputs().await?;
        if let Guarded::Done(sample) = &outcome {
            if sample.state_update {
                self.events.lock().unwrap().emit_state_update(sample);
            }
        }
        Ok(outcome)
    }

    /* Guarded single-byte register write; skipped while disabled. */
    pub async fn write_register(
        &mut self,
        register: u8,
        byte: u8,
    ) -> Result<Guarded<()>, TrackballError> {
        self.shared.lock().await.write_register(register, byte).await
    }

    /* Guarded single-byte register read; skipped while disabled. */
    pub async fn read_register(&mut self, register: u8) -> Result<Guarded<u8>, TrackballError> {
        self.shared.lock().await.read_register(register).await
    }

    /* Guarded block read of `N` consecutive registers; skipped while    */
    /* disabled. Kept distinct from `read_register` because the          */
    /* transport's single-byte and block primitives differ.              */
    pub async fn read_block<const N: usize>(
        &mut self,
        register: u8,
    ) -> Result<Guarded<[u8; N]>, TrackballError> {
        self.shared.lock().await.read_block::<N>(register).await
    }
}

impl<B: Bus> Drop for Trackball<B> {
    /* No background task survives the handle. */
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::MutexGuard;

    use async_trait::async_trait;

    use super::*;
    use crate::bus::BusError;

    #[derive(Default)]
    struct MockState {
        chip_id_bytes: [u8; 2],
        /* Scripted results for block reads at REG_LEFT; empty → idle block. */
        input_blocks: VecDeque<Result<[u8; INPUT_BLOCK_LEN], ()>>,
        writes: Vec<(u8, u8)>,
        block_reads: Vec<(u8, usize)>,
        fail_writes: bool,
        opens: usize,
    }

    #[derive(Clone, Default)]
    struct MockBus {
        state: Arc<StdMutex<MockState>>,
    }

    impl MockBus {
        fn with_chip_id(chip_id_bytes: [u8; 2]) -> Self {
            let bus = Self::default();
            bus.state().chip_id_bytes = chip_id_bytes;
            bus
        }

        fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap()
        }

        fn push_inputs(&self, block: [u8; INPUT_BLOCK_LEN]) {
            self.state().input_blocks.push_back(Ok(block));
        }

        fn push_input_error(&self) {
            self.state().input_blocks.push_back(Err(()));
        }
    }

    struct MockWire {
        state: Arc<StdMutex<MockState>>,
    }

    fn io_failure() -> BusError {
        BusError::Io {
            path: "/dev/i2c-mock".to_string(),
            source: std::io::Error::other("scripted failure"),
        }
    }

    #[async_trait]
    impl Bus for MockBus {
        type Wire = MockWire;

        async fn open(&self, _channel: u32) -> Result<MockWire, BusError> {
            self.state().opens += 1;
            Ok(MockWire {
                state: Arc::clone(&self.state),
            })
        }
    }

    #[async_trait]
    impl Wire for MockWire {
        async fn write_byte(
            &mut self,
            _address: u16,
            register: u8,
            byte: u8,
        ) -> Result<(), BusError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(io_failure());
            }
            state.writes.push((register, byte));
            Ok(())
        }

        async fn read_byte(&mut self, _address: u16, _register: u8) -> Result<u8, BusError> {
            Ok(0)
        }

        async fn read_block(
            &mut self,
            _address: u16,
            register: u8,
            buf: &mut [u8],
        ) -> Result<(), BusError> {
            let mut state = self.state.lock().unwrap();
            state.block_reads.push((register, buf.len()));

            match register {
                registers::REG_CHIP_ID_L => buf.copy_from_slice(&state.chip_id_bytes),
                registers::REG_LEFT => match state.input_blocks.pop_front() {
                    Some(Ok(block)) => buf.copy_from_slice(&block),
                    Some(Err(())) => return Err(io_failure()),
                    None => buf.fill(0),
                },
                _ => buf.fill(0),
            }
            Ok(())
        }
    }

    fn trackball(bus: &MockBus) -> Trackball<MockBus> {
        Trackball::with_bus(bus.clone(), 1, registers::I2C_ADDR_PRIMARY)
            .with_byte_order(ByteOrder::Little)
    }

    #[test]
    fn handle_defaults() {
        let bus = MockBus::default();
        let trackball = Trackball::with_bus(bus, 1, registers::I2C_ADDR_PRIMARY);
        assert_eq!(trackball.channel(), 1);
        assert_eq!(trackball.refresh_interval(), DEFAULT_REFRESH_INTERVAL_MS);
    }

    #[tokio::test]
    async fn enable_verifies_chip_identity() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);

        trackball.enable().await.expect("chip id matches");

        assert!(trackball.is_enabled().await);
        assert_eq!(trackball.chip_id().await, Some(0xBA11));
        assert_eq!(bus.state().opens, 1);
        /* Identity is read before anything else touches the bus. */
        assert_eq!(bus.state().block_reads[0], (registers::REG_CHIP_ID_L, 2));
    }

    #[tokio::test]
    async fn enable_rejects_unknown_chip_little_endian() {
        let bus = MockBus::with_chip_id([0x12, 0x34]);
        let mut trackball = trackball(&bus);

        let err = trackball.enable().await.expect_err("wrong chip id");
        assert!(
            matches!(err, TrackballError::DeviceNotFound { chip_id: 0x3412 }),
            "{err}"
        );
        assert!(!trackball.is_enabled().await);
    }

    #[tokio::test]
    async fn enable_rejects_unknown_chip_big_endian() {
        let bus = MockBus::with_chip_id([0x12, 0x34]);
        let mut trackball = Trackball::with_bus(bus, 1, registers::I2C_ADDR_PRIMARY)
            .with_byte_order(ByteOrder::Big);

        let err = trackball.enable().await.expect_err("wrong chip id");
        assert!(
            matches!(err, TrackballError::DeviceNotFound { chip_id: 0x1234 }),
            "{err}"
        );
    }

    #[tokio::test]
    async fn handle_is_reusable_after_identity_mismatch() {
        let bus = MockBus::with_chip_id([0x00, 0x00]);
        let mut trackball = trackball(&bus);

        trackball.enable().await.expect_err("wrong chip id");

        /* Fix the wiring and retry on the same handle. */
        bus.state().chip_id_bytes = [0x11, 0xBA];
        trackball.enable().await.expect("retry succeeds");
        assert!(trackball.is_enabled().await);
        assert_eq!(bus.state().opens, 2);
    }

    #[tokio::test]
    async fn set_color_scales_channels_by_contrast() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);
        trackball.enable().await.unwrap();

        trackball.set_contrast(0xA0).await.unwrap();
        bus.state().writes.clear();

        trackball
            .set_color(RgbwColor::new(0xF0, 0xF1, 0xF2, 0xFF))
            .await
            .unwrap();

        /* round(channel * 0xA0 / 255) per channel, red..white order */
        assert_eq!(
            bus.state().writes,
            vec![
                (registers::REG_LED_RED, 0x97),
                (registers::REG_LED_GRN, 0x97),
                (registers::REG_LED_BLU, 0x98),
                (registers::REG_LED_WHT, 0xA0),
            ]
        );
        assert_eq!(trackball.color().await, RgbwColor::new(0xF0, 0xF1, 0xF2, 0xFF));
    }

    #[tokio::test]
    async fn default_color_blanks_all_channels() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);
        trackball.enable().await.unwrap();

        trackball.set_contrast(0xFF).await.unwrap();
        bus.state().writes.clear();

        trackball.set_color(RgbwColor::default()).await.unwrap();

        assert_eq!(
            bus.state().writes,
            vec![
                (registers::REG_LED_RED, 0),
                (registers::REG_LED_GRN, 0),
                (registers::REG_LED_BLU, 0),
                (registers::REG_LED_WHT, 0),
            ]
        );
    }

    #[tokio::test]
    async fn set_contrast_reissues_stored_color() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);
        trackball.enable().await.unwrap();

        trackball
            .set_color(RgbwColor::new(0xFF, 0xFF, 0xFF, 0xFF))
            .await
            .unwrap();
        bus.state().writes.clear();

        trackball.set_contrast(0x7F).await.unwrap();

        assert_eq!(
            bus.state().writes,
            vec![
                (registers::REG_LED_RED, 0x7F),
                (registers::REG_LED_GRN, 0x7F),
                (registers::REG_LED_BLU, 0x7F),
                (registers::REG_LED_WHT, 0x7F),
            ]
        );
    }

    #[tokio::test]
    async fn disable_blanks_channels_and_clears_state() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);
        trackball.enable().await.unwrap();
        trackball.set_contrast(0xFF).await.unwrap();
        trackball
            .set_color(RgbwColor::new(0x10, 0x20, 0x30, 0x40))
            .await
            .unwrap();
        bus.state().writes.clear();

        trackball.disable().await.unwrap();

        assert!(!trackball.is_enabled().await);
        assert_eq!(trackball.contrast().await, 0);
        assert_eq!(
            bus.state().writes,
            vec![
                (registers::REG_LED_RED, 0),
                (registers::REG_LED_GRN, 0),
                (registers::REG_LED_BLU, 0),
                (registers::REG_LED_WHT, 0),
            ]
        );

        /* Disabling again is a no-op. */
        trackball.disable().await.unwrap();
        assert!(!trackball.is_enabled().await);
    }

    #[tokio::test]
    async fn disable_clears_enabled_even_when_blank_out_fails() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);
        trackball.enable().await.unwrap();

        bus.state().fail_writes = true;
        let err = trackball.disable().await.expect_err("blank-out fails");
        assert!(matches!(err, TrackballError::Bus(_)), "{err}");

        /* The resource release still happened. */
        assert!(!trackball.is_enabled().await);
    }

    #[tokio::test]
    async fn guarded_io_is_skipped_while_disabled() {
        let bus = MockBus::default();
        let mut trackball = trackball(&bus);

        let write = trackball
            .write_register(registers::REG_LED_RED, 0xFF)
            .await
            .unwrap();
        assert!(write.is_skipped());

        let read = trackball.read_register(registers::REG_SWITCH).await.unwrap();
        assert!(read.is_skipped());

        let block = trackball
            .read_block::<INPUT_BLOCK_LEN>(registers::REG_LEFT)
            .await
            .unwrap();
        assert!(block.is_skipped());

        let inputs = trackball.read_inputs().await.unwrap();
        assert!(inputs.is_skipped());

        /* The transport was never opened, let alone touched. */
        let state = bus.state();
        assert_eq!(state.opens, 0);
        assert!(state.writes.is_empty());
        assert!(state.block_reads.is_empty());
    }

    #[tokio::test]
    async fn read_inputs_emits_state_update() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);
        trackball.enable().await.unwrap();

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        trackball.on_state_update(move |sample| sink.lock().unwrap().push(*sample));

        bus.push_inputs([1, 2, 3, 4, 0x01]);
        let sample = trackball
            .read_inputs()
            .await
            .unwrap()
            .performed()
            .expect("device is on");

        assert_eq!((sample.left, sample.right, sample.up, sample.down), (1, 2, 3, 4));
        assert!(!sample.clicked);
        assert!(sample.click_state_changed);
        assert_eq!(*seen.lock().unwrap(), vec![sample]);

        /* An idle block is returned but never emitted. */
        bus.push_inputs([0, 0, 0, 0, 0]);
        let idle = trackball.read_inputs().await.unwrap().performed().unwrap();
        assert!(!idle.state_update);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_emits_on_schedule() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        trackball.on_state_update(move |sample| sink.lock().unwrap().push(*sample));

        bus.push_inputs([0, 0, 0, 0, 0x81]);
        bus.push_inputs([0, 0, 0, 0, 0]);
        trackball.enable_with_interval(50).await.unwrap();

        /* No immediate poll: the first cycle fires one full period in. */
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(seen.lock().unwrap().is_empty());

        /* Two periods: one click sample emitted, one idle cycle dropped. */
        tokio::time::sleep(Duration::from_millis(115)).await;
        let samples = seen.lock().unwrap().clone();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].clicked);
        assert!(samples[0].click_state_changed);

        trackball.disable().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failures_reach_error_listeners_and_polling_continues() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);

        let samples = Arc::new(StdMutex::new(Vec::new()));
        let errors = Arc::new(StdMutex::new(0usize));

        let sink = Arc::clone(&samples);
        trackball.on_state_update(move |sample| sink.lock().unwrap().push(*sample));
        let counter = Arc::clone(&errors);
        trackball.on_error(move |error| {
            assert!(matches!(error, TrackballError::Poll(_)), "{error}");
            *counter.lock().unwrap() += 1;
        });

        /* First cycle fails, second delivers motion. */
        bus.push_input_error();
        bus.push_inputs([5, 0, 0, 0, 0]);
        trackball.enable_with_interval(50).await.unwrap();

        tokio::time::sleep(Duration::from_millis(125)).await;

        assert_eq!(*errors.lock().unwrap(), 1);
        let seen = samples.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].left, 5);

        trackball.disable().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_reschedules_polling() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);
        trackball.enable_with_interval(50).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        let polls_before = input_poll_count(&bus);
        assert_eq!(polls_before, 2);

        /* Re-arming resets the schedule: nothing fires until a full new */
        /* period has elapsed.                                           */
        trackball.set_refresh_interval(200).await;
        assert_eq!(trackball.refresh_interval(), 200);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(input_poll_count(&bus), polls_before);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(input_poll_count(&bus), polls_before + 1);

        trackball.disable().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_while_disabled_only_stores_the_value() {
        let bus = MockBus::default();
        let mut trackball = trackball(&bus);

        trackball.set_refresh_interval(25).await;
        assert_eq!(trackball.refresh_interval(), 25);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(bus.state().opens, 0);
        assert!(bus.state().block_reads.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disable_stops_polling() {
        let bus = MockBus::with_chip_id([0x11, 0xBA]);
        let mut trackball = trackball(&bus);
        trackball.enable_with_interval(50).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(input_poll_count(&bus), 1);

        trackball.disable().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(input_poll_count(&bus), 1);
    }

    fn input_poll_count(bus: &MockBus) -> usize {
        bus.state()
            .block_reads
            .iter()
            .filter(|(register, _)| *register == registers::REG_LEFT)
            .count()
    }
}
