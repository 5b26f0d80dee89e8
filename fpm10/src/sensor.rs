//! High-level sensor interface
//!
//! [`Sensor`] owns the serial session to one module and exposes the full
//! workflow catalogue: single instructions, multi-packet data transfer and
//! the human-in-the-loop procedures. All sensor I/O runs under one
//! session-global mutex, so at most one workflow is on the wire at a time;
//! the asynchronous entry points offload onto a worker thread but take the
//! same mutex before touching the port.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use fpm10_core::constants::{
    BAUD_RATE_UNIT, DEFAULT_BAUD_RATE, DEFAULT_MODULE_ADDRESS, DEFAULT_PASSWORD,
    DEFAULT_TIMEOUT_MS, MIN_DATA_PACKAGE_LENGTH,
};
use fpm10_core::{image, CharBuffer, ConfirmationCode, Instruction, Packet, PacketKind};
use fpm10_transport::{FramedPort, SerialLink, UartLink};
use fpm10_types::{EnrollmentData, ImageScan, SearchResult, SystemParameters};

use crate::activity::{Activity, CancelFlag};
use crate::error::{Error, Result};
use crate::listener::HumanActionListener;
use crate::utils;

/// Length of the acknowledge payload carrying only a confirmation code
const PLAIN_ACK_LEN: usize = 1;

/// FPM10 fingerprint sensor attached to a serial port.
///
/// # Examples
///
/// ```no_run
/// use fpm10::Sensor;
///
/// fn main() -> fpm10::Result<()> {
///     let sensor = Sensor::new("/dev/ttyUSB0");
///     sensor.open()?;
///
///     println!("{} templates stored", sensor.template_count()?);
///
///     sensor.close();
///     Ok(())
/// }
/// ```
pub struct Sensor {
    port_name: String,
    baud_rate: u32,
    default_timeout: Duration,
    password: u32,
    capture_settle: Option<Duration>,
    session: Mutex<Session>,
}

/// Mutex-guarded session state
struct Session {
    /// Link parked between sessions, so a closed sensor can reopen
    link: Option<Box<dyn SerialLink>>,

    /// Present while the session is open and handshaken
    open: Option<OpenSession>,
}

/// An open, handshaken connection to the module
struct OpenSession {
    port: FramedPort,
    params: SystemParameters,
    default_timeout: Duration,
}

impl Sensor {
    /// Create a sensor on the given serial port with default settings.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port_name: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            password: DEFAULT_PASSWORD,
            capture_settle: None,
            session: Mutex::new(Session {
                link: None,
                open: None,
            }),
        }
    }

    /// Create a sensor over a caller-supplied link.
    ///
    /// The link's own port name and baud rate apply; everything else keeps
    /// the defaults until overridden by the builder methods.
    pub fn with_link(link: Box<dyn SerialLink>) -> Self {
        let port_name = link.port_name();
        let baud_rate = link.baud_rate();

        Self {
            port_name,
            baud_rate,
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            password: DEFAULT_PASSWORD,
            capture_settle: None,
            session: Mutex::new(Session {
                link: Some(link),
                open: None,
            }),
        }
    }

    /// Set the UART speed (default 57600 baud).
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the per-command timeout (default 2000 ms).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the handshake password (default 0).
    pub fn with_password(mut self, password: u32) -> Self {
        self.password = password;
        self
    }

    /// Set the pause between the two enrollment captures.
    ///
    /// Defaults to the per-command timeout.
    pub fn with_capture_settle(mut self, settle: Duration) -> Self {
        self.capture_settle = Some(settle);
        self
    }

    /// Name of the serial port this sensor talks through.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Check if the session is open.
    pub fn is_open(&self) -> bool {
        self.session.lock().open.is_some()
    }

    /// Open the serial port and handshake with the module.
    ///
    /// The handshake verifies the password and caches the module's system
    /// parameters for the lifetime of the session.
    ///
    /// # Errors
    ///
    /// Any failure closes the port again and surfaces as
    /// [`Error::Handshake`]; opening an already open sensor fails with the
    /// underlying transport error.
    pub fn open(&self) -> Result<()> {
        let mut session = self.session.lock();
        if session.open.is_some() {
            return Err(fpm10_transport::Error::AlreadyOpen.into());
        }

        info!("Opening sensor on {}...", self.port_name);

        let mut link = match session.link.take() {
            Some(link) => link,
            None => Box::new(UartLink::new(self.port_name.clone(), self.baud_rate)),
        };

        if let Err(err) = link.open() {
            session.link = Some(link);
            return Err(err.into());
        }

        let mut port = FramedPort::new(link, DEFAULT_MODULE_ADDRESS);

        match self.handshake(&mut port) {
            Ok(params) => {
                info!("Sensor ready: {}", params);
                session.open = Some(OpenSession {
                    port,
                    params,
                    default_timeout: self.default_timeout,
                });
                Ok(())
            }
            Err(err) => {
                match port.into_link() {
                    Ok(link) => session.link = Some(link),
                    Err(close_err) => {
                        warn!("Error while closing {}: {}", self.port_name, close_err);
                    }
                }

                Err(match err {
                    Error::Handshake(_) => err,
                    other => Error::Handshake(other.to_string()),
                })
            }
        }
    }

    /// Close the session.
    ///
    /// Idempotent; errors during teardown are logged and swallowed.
    pub fn close(&self) {
        let mut session = self.session.lock();
        let Some(open) = session.open.take() else {
            return;
        };

        info!("Closing sensor on {}", self.port_name);

        match open.port.into_link() {
            Ok(link) => session.link = Some(link),
            Err(err) => warn!("Error while closing {}: {}", self.port_name, err),
        }
    }

    /// The system parameters cached at handshake.
    pub fn parameters(&self) -> Result<SystemParameters> {
        self.session
            .lock()
            .open
            .as_ref()
            .map(|open| open.params)
            .ok_or(Error::NotConnected)
    }

    /// Capacity of the module's flash library.
    pub fn library_capacity(&self) -> Result<u16> {
        Ok(self.parameters()?.library_capacity)
    }

    /// Matching threshold grade of the module (1 - 5).
    pub fn security_level(&self) -> Result<u16> {
        Ok(self.parameters()?.security_level)
    }

    /// Current operation status of the module.
    pub fn status_register(&self) -> Result<u16> {
        Ok(self.parameters()?.status_register)
    }

    /// Max payload of a transfer data packet.
    pub fn data_package_length(&self) -> Result<u16> {
        Ok(self.parameters()?.data_package_length)
    }

    /// System identifier code of the module.
    pub fn system_identifier_code(&self) -> Result<u16> {
        Ok(self.parameters()?.system_identifier_code)
    }

    /// UART speed the module reports it is configured for.
    pub fn module_baud_rate(&self) -> Result<u32> {
        Ok(self.parameters()?.baud_rate)
    }

    // ---------------------------------------------------------------
    // Single instructions
    // ---------------------------------------------------------------

    /// Detect a finger and capture its image into the image buffer.
    ///
    /// Returns `false` while no finger is on the sensor.
    pub fn get_image(&self) -> Result<bool> {
        self.open_session()?.get_image()
    }

    /// Generate a character file from the image buffer into `buffer`.
    pub fn extract_features(&self, buffer: CharBuffer) -> Result<()> {
        self.open_session()?.extract_features(buffer)
    }

    /// Match the templates held in char buffer 1 and char buffer 2.
    ///
    /// Returns the matching score, or `-1` when they do not match.
    pub fn match_templates(&self) -> Result<i32> {
        self.open_session()?.match_templates()
    }

    /// Search the library for the template in char buffer 1.
    pub fn search(&self) -> Result<Option<SearchResult>> {
        self.open_session()?.search()
    }

    /// Combine both char buffers into a model, stored back in both.
    pub fn create_model(&self) -> Result<()> {
        self.open_session()?.create_model()
    }

    /// Store the template in `buffer` at the given library slot.
    pub fn store_model(&self, slot: u16, buffer: CharBuffer) -> Result<()> {
        self.open_session()?.store_model(slot, buffer)
    }

    /// Load the template at the given library slot into `buffer`.
    pub fn load_model(&self, slot: u16, buffer: CharBuffer) -> Result<()> {
        self.open_session()?.load_model(slot, buffer)
    }

    /// Transfer the template in `buffer` to the host.
    pub fn download_model(&self, buffer: CharBuffer) -> Result<Vec<u8>> {
        self.open_session()?.download_model(buffer)
    }

    /// Transfer a template from the host into `buffer`.
    ///
    /// The upload is verified by downloading the buffer back; the return
    /// value reports whether the echo matched.
    pub fn upload_model(&self, buffer: CharBuffer, model: &[u8]) -> Result<bool> {
        self.open_session()?.upload_model(buffer, model)
    }

    /// Transfer the image buffer to the host.
    pub fn download_scan(&self) -> Result<ImageScan> {
        self.open_session()?.download_scan()
    }

    /// Transfer a scan from the host into the image buffer.
    pub fn upload_scan(&self, scan: &ImageScan) -> Result<()> {
        self.open_session()?.upload_scan(scan)
    }

    /// Delete the template at the given library slot.
    pub fn delete_model(&self, slot: u16) -> Result<()> {
        self.delete_models(slot, 1)
    }

    /// Delete `count` templates starting at the given library slot.
    pub fn delete_models(&self, slot: u16, count: u16) -> Result<()> {
        self.open_session()?.delete_models(slot, count)
    }

    /// Delete every stored template.
    pub fn empty_library(&self) -> Result<()> {
        self.open_session()?.empty_library()
    }

    /// Number of templates stored in the library.
    pub fn template_count(&self) -> Result<u16> {
        self.open_session()?.template_count()
    }

    // ---------------------------------------------------------------
    // Finger polling
    // ---------------------------------------------------------------

    /// Poll until a finger is captured.
    pub fn wait_for_fingerprint(&self) -> Result<()> {
        let mut session = self.open_session()?;
        wait_for_fingerprint(&mut session, &CancelFlag::new())
    }

    /// Poll until the finger is lifted off the sensor.
    pub fn wait_for_finger_removed(&self) -> Result<()> {
        let mut session = self.open_session()?;
        wait_for_finger_removed(&mut session, &CancelFlag::new())
    }

    // ---------------------------------------------------------------
    // Workflows
    // ---------------------------------------------------------------

    /// Capture a finger twice and store the combined model at `slot`.
    pub fn enroll(&self, slot: u16, listener: &dyn HumanActionListener) -> Result<()> {
        let mut session = self.open_session()?;
        self.enroll_locked(&mut session, slot, listener, &CancelFlag::new())
    }

    /// Like [`enroll`](Self::enroll), additionally returning the raw scans
    /// and the combined feature template.
    pub fn enroll_and_get_data(
        &self,
        slot: u16,
        listener: &dyn HumanActionListener,
    ) -> Result<EnrollmentData> {
        let mut session = self.open_session()?;
        self.enroll_and_get_data_locked(&mut session, slot, listener, &CancelFlag::new())
    }

    /// Capture a finger and search the library for it.
    pub fn search_fingerprint(
        &self,
        listener: &dyn HumanActionListener,
    ) -> Result<Option<SearchResult>> {
        let mut session = self.open_session()?;
        self.search_fingerprint_locked(&mut session, listener, &CancelFlag::new())
    }

    /// Capture a finger and match it against the template at `slot`.
    ///
    /// Returns the matching score, or `-1` when they do not match.
    pub fn match_fingerprint(
        &self,
        slot: u16,
        listener: &dyn HumanActionListener,
    ) -> Result<i32> {
        let mut session = self.open_session()?;
        self.match_fingerprint_locked(&mut session, slot, listener, &CancelFlag::new())
    }

    /// Capture a finger and save its image as a PNG file.
    pub fn download_image(
        &self,
        path: impl AsRef<Path>,
        listener: &dyn HumanActionListener,
    ) -> Result<()> {
        let mut session = self.open_session()?;
        self.download_image_locked(&mut session, path.as_ref(), listener, &CancelFlag::new())
    }

    /// Upload a fingerprint image file and search the library for it.
    pub fn upload_and_search(&self, path: impl AsRef<Path>) -> Result<Option<SearchResult>> {
        let scan = utils::load_scan(path)?;
        let mut session = self.open_session()?;

        session.upload_scan(&scan)?;
        session.extract_features(CharBuffer::One)?;
        session.search()
    }

    /// Store a previously downloaded feature template at `slot`.
    pub fn enroll_from_template(&self, slot: u16, features: &[u8]) -> Result<()> {
        let mut session = self.open_session()?;

        let _echoed = session.upload_model(CharBuffer::Two, features)?;
        session.store_model(slot, CharBuffer::Two)
    }

    /// Combine two previously captured scans into a model stored at `slot`.
    pub fn enroll_from_scans(
        &self,
        slot: u16,
        scan1: &ImageScan,
        scan2: &ImageScan,
    ) -> Result<()> {
        let mut session = self.open_session()?;

        session.upload_scan(scan1)?;
        session.extract_features(CharBuffer::One)?;

        thread::sleep(self.settle_interval());

        session.upload_scan(scan2)?;
        session.extract_features(CharBuffer::Two)?;

        session.create_model()?;
        session.store_model(slot, CharBuffer::Two)
    }

    // ---------------------------------------------------------------
    // Asynchronous workflows
    // ---------------------------------------------------------------

    /// Run [`enroll`](Self::enroll) on a worker thread.
    pub fn enroll_async(
        self: &Arc<Self>,
        slot: u16,
        listener: Arc<dyn HumanActionListener>,
    ) -> Activity<()> {
        self.spawn_activity(move |sensor, cancel| {
            let mut session = sensor.open_session()?;
            sensor.enroll_locked(&mut session, slot, listener.as_ref(), cancel)
        })
    }

    /// Run [`enroll_and_get_data`](Self::enroll_and_get_data) on a worker
    /// thread.
    pub fn enroll_and_get_data_async(
        self: &Arc<Self>,
        slot: u16,
        listener: Arc<dyn HumanActionListener>,
    ) -> Activity<EnrollmentData> {
        self.spawn_activity(move |sensor, cancel| {
            let mut session = sensor.open_session()?;
            sensor.enroll_and_get_data_locked(&mut session, slot, listener.as_ref(), cancel)
        })
    }

    /// Run [`search_fingerprint`](Self::search_fingerprint) on a worker
    /// thread.
    pub fn search_fingerprint_async(
        self: &Arc<Self>,
        listener: Arc<dyn HumanActionListener>,
    ) -> Activity<Option<SearchResult>> {
        self.spawn_activity(move |sensor, cancel| {
            let mut session = sensor.open_session()?;
            sensor.search_fingerprint_locked(&mut session, listener.as_ref(), cancel)
        })
    }

    /// Run [`match_fingerprint`](Self::match_fingerprint) on a worker
    /// thread.
    pub fn match_fingerprint_async(
        self: &Arc<Self>,
        slot: u16,
        listener: Arc<dyn HumanActionListener>,
    ) -> Activity<i32> {
        self.spawn_activity(move |sensor, cancel| {
            let mut session = sensor.open_session()?;
            sensor.match_fingerprint_locked(&mut session, slot, listener.as_ref(), cancel)
        })
    }

    /// Run [`download_image`](Self::download_image) on a worker thread.
    pub fn download_image_async(
        self: &Arc<Self>,
        path: impl Into<PathBuf>,
        listener: Arc<dyn HumanActionListener>,
    ) -> Activity<()> {
        let path = path.into();
        self.spawn_activity(move |sensor, cancel| {
            let mut session = sensor.open_session()?;
            sensor.download_image_locked(&mut session, &path, listener.as_ref(), cancel)
        })
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn open_session(&self) -> Result<MappedMutexGuard<'_, OpenSession>> {
        MutexGuard::try_map(self.session.lock(), |session| session.open.as_mut())
            .map_err(|_| Error::NotConnected)
    }

    fn settle_interval(&self) -> Duration {
        self.capture_settle.unwrap_or(self.default_timeout)
    }

    fn handshake(&self, port: &mut FramedPort) -> Result<SystemParameters> {
        if !verify_password(port, self.password, self.default_timeout)? {
            return Err(Error::Handshake("password verification failed".into()));
        }

        match read_system_parameters(port, self.default_timeout)? {
            Some(params) => Ok(params),
            None => Err(Error::Handshake("cannot read system parameters".into())),
        }
    }

    fn spawn_activity<T, F>(self: &Arc<Self>, job: F) -> Activity<T>
    where
        T: Send + 'static,
        F: FnOnce(&Sensor, &CancelFlag) -> Result<T> + Send + 'static,
    {
        let (activity, completer) = Activity::pending();
        let cancel = activity.cancel_flag();
        let sensor = Arc::clone(self);

        thread::spawn(move || {
            let outcome = job(&sensor, &cancel);
            completer.complete(outcome);
        });

        activity
    }

    fn enroll_locked(
        &self,
        session: &mut OpenSession,
        slot: u16,
        listener: &dyn HumanActionListener,
        cancel: &CancelFlag,
    ) -> Result<()> {
        debug!("Enrolling into slot {}...", slot);

        listener.put_finger();
        wait_for_fingerprint(session, cancel)?;
        session.extract_features(CharBuffer::One)?;

        listener.remove_finger();
        wait_for_finger_removed(session, cancel)?;

        // let the sensor surface clear before the second capture
        thread::sleep(self.settle_interval());

        listener.put_finger();
        wait_for_fingerprint(session, cancel)?;
        session.extract_features(CharBuffer::Two)?;

        listener.remove_finger();
        wait_for_finger_removed(session, cancel)?;

        session.create_model()?;
        session.store_model(slot, CharBuffer::Two)?;

        debug!("Enrolled slot {}", slot);
        Ok(())
    }

    fn enroll_and_get_data_locked(
        &self,
        session: &mut OpenSession,
        slot: u16,
        listener: &dyn HumanActionListener,
        cancel: &CancelFlag,
    ) -> Result<EnrollmentData> {
        debug!("Enrolling into slot {} with data capture...", slot);

        listener.put_finger();
        wait_for_fingerprint(session, cancel)?;

        listener.wait_while_data_transferring();
        let scan1 = session.download_scan()?;
        session.extract_features(CharBuffer::One)?;

        listener.remove_finger();
        wait_for_finger_removed(session, cancel)?;

        listener.put_finger();
        wait_for_fingerprint(session, cancel)?;

        listener.wait_while_data_transferring();
        let scan2 = session.download_scan()?;
        session.extract_features(CharBuffer::Two)?;

        session.create_model()?;
        let features = session.download_model(CharBuffer::Two)?;
        session.store_model(slot, CharBuffer::Two)?;

        debug!("Enrolled slot {} ({} feature bytes)", slot, features.len());
        Ok(EnrollmentData {
            features,
            scan1,
            scan2,
        })
    }

    fn search_fingerprint_locked(
        &self,
        session: &mut OpenSession,
        listener: &dyn HumanActionListener,
        cancel: &CancelFlag,
    ) -> Result<Option<SearchResult>> {
        listener.put_finger();
        wait_for_fingerprint(session, cancel)?;
        session.extract_features(CharBuffer::One)?;

        listener.remove_finger();
        wait_for_finger_removed(session, cancel)?;

        session.search()
    }

    fn match_fingerprint_locked(
        &self,
        session: &mut OpenSession,
        slot: u16,
        listener: &dyn HumanActionListener,
        cancel: &CancelFlag,
    ) -> Result<i32> {
        session.load_model(slot, CharBuffer::One)?;

        listener.put_finger();
        wait_for_fingerprint(session, cancel)?;
        session.extract_features(CharBuffer::Two)?;

        listener.remove_finger();
        wait_for_finger_removed(session, cancel)?;

        session.match_templates()
    }

    fn download_image_locked(
        &self,
        session: &mut OpenSession,
        path: &Path,
        listener: &dyn HumanActionListener,
        cancel: &CancelFlag,
    ) -> Result<()> {
        listener.put_finger();
        wait_for_fingerprint(session, cancel)?;
        listener.remove_finger();

        let scan = session.download_scan()?;
        utils::save_scan(&scan, path)
    }
}

/// Poll `GetImage` until a finger is captured.
fn wait_for_fingerprint(session: &mut OpenSession, cancel: &CancelFlag) -> Result<()> {
    while !session.get_image()? {
        if cancel.is_set() {
            return Err(Error::Cancelled);
        }
    }

    Ok(())
}

/// Poll `GetImage` until the finger is gone.
fn wait_for_finger_removed(session: &mut OpenSession, cancel: &CancelFlag) -> Result<()> {
    while session.get_image()? {
        if cancel.is_set() {
            return Err(Error::Cancelled);
        }
    }

    Ok(())
}

/// Handshake step one: check the password. Any malformed or negative reply
/// counts as a plain `false`.
fn verify_password(port: &mut FramedPort, password: u32, timeout: Duration) -> Result<bool> {
    let mut command = vec![Instruction::VerifyPassword.opcode()];
    command.extend_from_slice(&password.to_be_bytes());

    port.write_packet(&Packet::command(command))?;

    let reply = port.read_packet(timeout)?;
    Ok(matches!(
        reply,
        Some(packet)
            if packet.kind == PacketKind::Ack
                && packet.payload.len() == PLAIN_ACK_LEN
                && ConfirmationCode::from(packet.payload[0]).is_ok()
    ))
}

/// Handshake step two: read the module's configuration.
fn read_system_parameters(
    port: &mut FramedPort,
    timeout: Duration,
) -> Result<Option<SystemParameters>> {
    port.write_packet(&Packet::command(vec![Instruction::ReadSysParam.opcode()]))?;

    let reply = match port.read_packet(timeout)? {
        Some(reply) => reply,
        None => return Ok(None),
    };

    if reply.kind != PacketKind::Ack
        || reply.payload.len() != 17
        || !ConfirmationCode::from(reply.payload[0]).is_ok()
    {
        return Ok(None);
    }

    let data = &reply.payload;
    let length_code = u16::from_be_bytes([data[13], data[14]]);
    let baud_multiplier = u16::from_be_bytes([data[15], data[16]]);

    Ok(Some(SystemParameters {
        status_register: u16::from_be_bytes([data[1], data[2]]),
        system_identifier_code: u16::from_be_bytes([data[3], data[4]]),
        library_capacity: u16::from_be_bytes([data[5], data[6]]),
        security_level: u16::from_be_bytes([data[7], data[8]]),
        module_address: u32::from_be_bytes([data[9], data[10], data[11], data[12]]),
        // 32 * 2^code; codes above the documented 256-byte setting do not occur
        data_package_length: MIN_DATA_PACKAGE_LENGTH << length_code.min(3),
        baud_rate: u32::from(baud_multiplier) * BAUD_RATE_UNIT,
    }))
}

impl OpenSession {
    /// Send one command and return the acknowledge payload after checking
    /// the reply kind and payload length.
    fn exchange(&mut self, command: Vec<u8>, reply_len: usize) -> Result<Bytes> {
        self.port.write_packet(&Packet::command(command))?;

        let reply = self
            .port
            .read_packet(self.default_timeout)?
            .ok_or(Error::NoReply)?;

        if reply.kind != PacketKind::Ack || reply.payload.len() != reply_len {
            return Err(Error::InvalidResponse(format!(
                "expected a {reply_len} byte acknowledge, got {reply}"
            )));
        }

        Ok(reply.payload)
    }

    /// Like [`exchange`](Self::exchange), additionally requiring the OK
    /// confirmation code.
    fn confirm(&mut self, command: Vec<u8>, reply_len: usize) -> Result<Bytes> {
        let payload = self.exchange(command, reply_len)?;

        let code = ConfirmationCode::from(payload[0]);
        if !code.is_ok() {
            return Err(Error::Sensor(code));
        }

        Ok(payload)
    }

    fn get_image(&mut self) -> Result<bool> {
        let payload = self.exchange(vec![Instruction::GetImage.opcode()], PLAIN_ACK_LEN)?;

        match ConfirmationCode::from(payload[0]) {
            ConfirmationCode::Ok => Ok(true),
            ConfirmationCode::NoFinger => Ok(false),
            code => Err(Error::Sensor(code)),
        }
    }

    fn extract_features(&mut self, buffer: CharBuffer) -> Result<()> {
        self.confirm(
            vec![Instruction::Image2Tz.opcode(), buffer.id()],
            PLAIN_ACK_LEN,
        )?;
        Ok(())
    }

    fn match_templates(&mut self) -> Result<i32> {
        let payload = self.exchange(vec![Instruction::Match.opcode()], 3)?;

        match ConfirmationCode::from(payload[0]) {
            ConfirmationCode::Ok => {
                Ok(i32::from(u16::from_be_bytes([payload[1], payload[2]])))
            }
            ConfirmationCode::NoMatch => Ok(-1),
            code => Err(Error::Sensor(code)),
        }
    }

    fn search(&mut self) -> Result<Option<SearchResult>> {
        let capacity = self.params.library_capacity;
        let command = vec![
            Instruction::Search.opcode(),
            CharBuffer::One.id(),
            0x00,
            0x00,
            (capacity >> 8) as u8,
            (capacity & 0xFF) as u8,
        ];

        let payload = self.exchange(command, 5)?;

        match ConfirmationCode::from(payload[0]) {
            ConfirmationCode::Ok => Ok(Some(SearchResult {
                id: u16::from_be_bytes([payload[1], payload[2]]),
                match_score: u16::from_be_bytes([payload[3], payload[4]]),
            })),
            ConfirmationCode::NotFound => Ok(None),
            code => Err(Error::Sensor(code)),
        }
    }

    fn create_model(&mut self) -> Result<()> {
        self.confirm(vec![Instruction::CreateModel.opcode()], PLAIN_ACK_LEN)?;
        Ok(())
    }

    fn store_model(&mut self, slot: u16, buffer: CharBuffer) -> Result<()> {
        let [slot_hi, slot_lo] = slot.to_be_bytes();
        self.confirm(
            vec![Instruction::Store.opcode(), buffer.id(), slot_hi, slot_lo],
            PLAIN_ACK_LEN,
        )?;
        Ok(())
    }

    fn load_model(&mut self, slot: u16, buffer: CharBuffer) -> Result<()> {
        let [slot_hi, slot_lo] = slot.to_be_bytes();
        self.confirm(
            vec![
                Instruction::LoadChar.opcode(),
                buffer.id(),
                slot_hi,
                slot_lo,
            ],
            PLAIN_ACK_LEN,
        )?;
        Ok(())
    }

    fn delete_models(&mut self, slot: u16, count: u16) -> Result<()> {
        let [slot_hi, slot_lo] = slot.to_be_bytes();
        let [count_hi, count_lo] = count.to_be_bytes();
        self.confirm(
            vec![
                Instruction::DeleteChar.opcode(),
                slot_hi,
                slot_lo,
                count_hi,
                count_lo,
            ],
            PLAIN_ACK_LEN,
        )?;
        Ok(())
    }

    fn empty_library(&mut self) -> Result<()> {
        self.confirm(vec![Instruction::EmptyLib.opcode()], PLAIN_ACK_LEN)?;
        Ok(())
    }

    fn template_count(&mut self) -> Result<u16> {
        let payload = self.confirm(vec![Instruction::TemplateCount.opcode()], 3)?;
        Ok(u16::from_be_bytes([payload[1], payload[2]]))
    }

    fn download_model(&mut self, buffer: CharBuffer) -> Result<Vec<u8>> {
        debug!("Downloading template from {}...", buffer);

        self.confirm(
            vec![Instruction::DownloadChar.opcode(), buffer.id()],
            PLAIN_ACK_LEN,
        )?;

        let data = self.receive_stream()?;
        self.drain()?;

        debug!("Downloaded {} template bytes", data.len());
        Ok(data)
    }

    fn upload_model(&mut self, buffer: CharBuffer, model: &[u8]) -> Result<bool> {
        debug!("Uploading {} template bytes to {}...", model.len(), buffer);

        self.confirm(
            vec![Instruction::UploadChar.opcode(), buffer.id()],
            PLAIN_ACK_LEN,
        )?;
        self.drain()?;

        self.send_stream(model)?;

        // read the buffer back and compare to catch silent corruption
        let echoed = self.download_model(buffer)?;
        Ok(echoed == model)
    }

    fn download_scan(&mut self) -> Result<ImageScan> {
        debug!("Downloading image buffer...");

        self.confirm(vec![Instruction::DownloadImage.opcode()], PLAIN_ACK_LEN)?;

        let mut pixels = Vec::with_capacity(ImageScan::PIXEL_COUNT);
        let mut kind = PacketKind::Ack;
        while kind != PacketKind::EndData {
            let reply = self
                .port
                .read_packet(self.default_timeout)?
                .ok_or(Error::NoReply)?;

            kind = reply.kind;
            image::expand_nibbles_into(&reply.payload, &mut pixels, ImageScan::PIXEL_COUNT);
        }

        self.drain()?;

        // a short stream leaves the remaining rows black
        pixels.resize(ImageScan::PIXEL_COUNT, 0);
        Ok(ImageScan::from_pixels(pixels)?)
    }

    fn upload_scan(&mut self, scan: &ImageScan) -> Result<()> {
        debug!("Uploading scan to the image buffer...");

        self.confirm(vec![Instruction::UploadImage.opcode()], PLAIN_ACK_LEN)?;
        self.drain()?;

        let packed = image::pack_nibbles(scan.pixels());
        self.send_stream(&packed)?;

        self.drain()?;
        Ok(())
    }

    /// Collect a device-to-host stream.
    ///
    /// The loop keys on the previously read packet, so it is entered with
    /// the acknowledge and the first iteration reads the first data packet.
    /// Payloads are concatenated in arrival order, including the one
    /// carried by the end-of-data packet.
    fn receive_stream(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();

        let mut kind = PacketKind::Ack;
        while kind != PacketKind::EndData {
            let reply = self
                .port
                .read_packet(self.default_timeout)?
                .ok_or(Error::NoReply)?;

            kind = reply.kind;
            data.extend_from_slice(&reply.payload);
        }

        Ok(data)
    }

    /// Send a host-to-device stream in data-package-length chunks, the last
    /// chunk marked end-of-data.
    fn send_stream(&mut self, data: &[u8]) -> Result<()> {
        let chunk_size = usize::from(self.params.data_package_length);

        let mut chunks = data.chunks(chunk_size).peekable();
        while let Some(chunk) = chunks.next() {
            let kind = if chunks.peek().is_some() {
                PacketKind::Data
            } else {
                PacketKind::EndData
            };

            self.port.write_packet(&Packet::new(kind, chunk.to_vec()))?;
        }

        Ok(())
    }

    /// Swallow stragglers after a data stream. The read past the last
    /// packet costs one full timeout.
    fn drain(&mut self) -> Result<()> {
        while self.port.read_packet(self.default_timeout)?.is_some() {}
        Ok(())
    }
}
