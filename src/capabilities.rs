//! The kernel capability table.
//!
//! Operators never consult process-wide state: every `create` takes a [`Capabilities`] value and
//! fails with [`PoolError::Uninitialized`](crate::PoolError::Uninitialized) when it was never
//! initialized.

/// Tiling constants declared by a reduction kernel.
///
/// `mr` taps are consumed by the first (or only) pass, `qr` taps by every following pass of a
/// multipass kernel. A unipass-only kernel declares `qr == 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolTile {
    pub mr: u32,
    pub qr: u32,
}

impl PoolTile {
    pub const fn new(mr: u32, qr: u32) -> Self {
        Self { mr, qr }
    }
}

/// Kernel tiling for every operator family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    initialized: bool,
    f32_avgpool: PoolTile,
    f32_pavgpool: PoolTile,
    q8_avgpool: PoolTile,
    f32_maxpool: PoolTile,
    u8_maxpool: PoolTile,
    f32_argmaxpool: [PoolTile; 3],
    prelu_row_tile: usize,
}

impl Capabilities {
    /// Detects the available kernels. The portable kernels are always available.
    pub fn initialize() -> Self {
        let caps = Self {
            initialized: true,
            ..Self::uninitialized()
        };
        log::debug!("initialized pooling capabilities: {:?}", caps);
        caps
    }

    /// A table that every `create` rejects.
    pub fn uninitialized() -> Self {
        Self {
            initialized: false,
            f32_avgpool: PoolTile::new(9, 8),
            f32_pavgpool: PoolTile::new(9, 8),
            q8_avgpool: PoolTile::new(9, 8),
            f32_maxpool: PoolTile::new(9, 8),
            u8_maxpool: PoolTile::new(9, 8),
            f32_argmaxpool: [PoolTile::new(4, 0), PoolTile::new(9, 0), PoolTile::new(9, 8)],
            prelu_row_tile: 4,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn f32_avgpool(&self) -> PoolTile {
        self.f32_avgpool
    }

    pub fn f32_pavgpool(&self) -> PoolTile {
        self.f32_pavgpool
    }

    pub fn q8_avgpool(&self) -> PoolTile {
        self.q8_avgpool
    }

    pub fn f32_maxpool(&self) -> PoolTile {
        self.f32_maxpool
    }

    pub fn u8_maxpool(&self) -> PoolTile {
        self.u8_maxpool
    }

    /// Arg-max kernels in selection order: unipass kernels by increasing `mr`, then the
    /// multipass fallback.
    pub fn f32_argmaxpool(&self) -> &[PoolTile; 3] {
        &self.f32_argmaxpool
    }

    /// Rows processed per PReLU kernel call.
    pub fn prelu_row_tile(&self) -> usize {
        self.prelu_row_tile
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::initialize()
    }
}
