//! Human interaction callbacks

/// Callbacks through which a workflow instructs the person at the sensor.
///
/// Workflows may run on a worker thread, so implementations must be safe to
/// call from there; use interior mutability for any state.
pub trait HumanActionListener: Send + Sync {
    /// Ask the human to put a finger on the sensor.
    fn put_finger(&self);

    /// Ask the human to lift the finger off the sensor.
    fn remove_finger(&self);

    /// Tell the human to hold still while scan data is transferring.
    ///
    /// Only the data-returning enrollment emits this; the default does
    /// nothing.
    fn wait_while_data_transferring(&self) {}
}
