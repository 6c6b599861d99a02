/// Type-state markers for the manager builder
///
/// These track at compile time whether the hub address and the device name
/// have been provided.
use std::marker::PhantomData;

/// Marker trait for hub address state
pub trait HubState {}

/// Hub address has not been set
pub struct NoHub;
impl HubState for NoHub {}

/// Hub address has been set
pub struct HasHub;
impl HubState for HasHub {}

/// Marker trait for device name state
pub trait DeviceState {}

/// Device name has not been set
pub struct NoDevice;
impl DeviceState for NoDevice {}

/// Device name has been set
pub struct HasDevice;
impl DeviceState for HasDevice {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<H, D> {
    _hub: PhantomData<H>,
    _device: PhantomData<D>,
}

impl<H, D> TypeState<H, D> {
    pub(crate) fn new() -> Self {
        Self {
            _hub: PhantomData,
            _device: PhantomData,
        }
    }
}

impl<H, D> Default for TypeState<H, D> {
    fn default() -> Self {
        Self::new()
    }
}
