//! Device traits and types
//!
//! This module defines the native-resource interface WITHOUT pulling in any backend-specific
//! dependencies. The allocators and the arena depend on these traits, never on a concrete API.

use std::fmt;
use std::ptr::NonNull;

/// Errors reported by a device or memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Out of device or host memory
    OutOfMemory,
    /// No memory type satisfies the requested type bits and property flags
    NoCompatibleMemoryType,
    /// Memory could not be mapped for CPU access
    MapFailed,
    /// The device has not been initialized (or was already torn down)
    NotInitialized,
    /// A native handle was not recognised by the device
    InvalidHandle,
    /// Backend-specific error (opaque)
    Backend(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::OutOfMemory => write!(f, "device out of memory"),
            DeviceError::NoCompatibleMemoryType => write!(f, "no compatible memory type"),
            DeviceError::MapFailed => write!(f, "failed to map device memory"),
            DeviceError::NotInitialized => write!(f, "device not initialized"),
            DeviceError::InvalidHandle => write!(f, "invalid native handle"),
            DeviceError::Backend(msg) => write!(f, "backend error: {}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}

macro_rules! raw_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u64);

        impl $name {
            /// The null native handle.
            pub const NULL: Self = Self(0);

            /// Whether this is the null handle.
            #[inline]
            pub fn is_null(&self) -> bool {
                self.0 == 0
            }
        }
    };
}

raw_handle!(
    /// Native buffer object.
    RawBuffer
);
raw_handle!(
    /// Native device memory allocation.
    RawMemory
);
raw_handle!(
    /// Native image object.
    RawImage
);
raw_handle!(
    /// Native image view object.
    RawImageView
);

macro_rules! flag_set {
    ($(#[$meta:meta])* $name:ident { $($(#[$cmeta:meta])* $flag:ident = $bits:expr;)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name {
            pub bits: u32,
        }

        impl $name {
            $($(#[$cmeta])* pub const $flag: Self = Self { bits: $bits };)*

            /// No flags set.
            pub const fn empty() -> Self {
                Self { bits: 0 }
            }

            /// Whether no flags are set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Whether every flag in `other` is also set in `self`.
            pub const fn contains(&self, other: Self) -> bool {
                self.bits & other.bits == other.bits
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self { bits: self.bits | rhs.bits }
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.bits |= rhs.bits;
            }
        }
    };
}

flag_set!(
    /// Buffer usage flags (Vulkan bit layout)
    BufferUsage {
        TRANSFER_SRC = 0x0001;
        TRANSFER_DST = 0x0002;
        UNIFORM_TEXEL_BUFFER = 0x0004;
        STORAGE_TEXEL_BUFFER = 0x0008;
        UNIFORM_BUFFER = 0x0010;
        STORAGE_BUFFER = 0x0020;
        INDEX_BUFFER = 0x0040;
        VERTEX_BUFFER = 0x0080;
        INDIRECT_BUFFER = 0x0100;
    }
);

flag_set!(
    /// Image usage flags (Vulkan bit layout)
    ImageUsage {
        TRANSFER_SRC = 0x0001;
        TRANSFER_DST = 0x0002;
        SAMPLED = 0x0004;
        STORAGE = 0x0008;
        COLOR_ATTACHMENT = 0x0010;
        DEPTH_STENCIL_ATTACHMENT = 0x0020;
        TRANSIENT_ATTACHMENT = 0x0040;
        INPUT_ATTACHMENT = 0x0080;
    }
);

flag_set!(
    /// Memory property flags (Vulkan bit layout)
    MemoryPropertyFlags {
        DEVICE_LOCAL = 0x0001;
        HOST_VISIBLE = 0x0002;
        HOST_COHERENT = 0x0004;
        HOST_CACHED = 0x0008;
        LAZILY_ALLOCATED = 0x0010;
    }
);

/// Texel format. Values follow Vulkan's `VkFormat` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Format(pub u32);

impl Format {
    pub const UNDEFINED: Self = Self(0);
    pub const R8_UNORM: Self = Self(9);
    pub const R8G8B8A8_UNORM: Self = Self(37);
    pub const R8G8B8A8_SRGB: Self = Self(43);
    pub const B8G8R8A8_UNORM: Self = Self(44);
    pub const B8G8R8A8_SRGB: Self = Self(50);
    pub const R16G16B16A16_SFLOAT: Self = Self(97);
    pub const R32_SFLOAT: Self = Self(100);
    pub const R32G32B32A32_SFLOAT: Self = Self(109);
    pub const D16_UNORM: Self = Self(124);
    pub const D32_SFLOAT: Self = Self(126);
    pub const D24_UNORM_S8_UINT: Self = Self(129);

    /// Whether this is the undefined format.
    pub fn is_undefined(&self) -> bool {
        self.0 == 0
    }

    /// Whether this is a depth (or depth/stencil) format.
    pub fn is_depth(&self) -> bool {
        matches!(*self, Self::D16_UNORM | Self::D32_SFLOAT | Self::D24_UNORM_S8_UINT)
    }

    /// Bytes per texel. Unknown formats are treated as 4 bytes.
    pub fn bytes_per_texel(&self) -> u64 {
        match *self {
            Self::R8_UNORM => 1,
            Self::D16_UNORM => 2,
            Self::R16G16B16A16_SFLOAT => 8,
            Self::R32G32B32A32_SFLOAT => 16,
            _ => 4,
        }
    }
}

/// Image extent in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3D {
    /// A 2D extent (depth 1).
    pub const fn d2(width: u32, height: u32) -> Self {
        Self { width, height, depth: 1 }
    }

    /// Number of texels covered by the extent, saturating at `u64::MAX`.
    pub fn texel_count(&self) -> u64 {
        (self.width as u64)
            .saturating_mul(self.height as u64)
            .saturating_mul(self.depth as u64)
    }
}

/// Memory requirements reported for a native buffer or image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequirements {
    pub size: u64,
    pub alignment: u64,
    /// Bit `i` set means memory type `i` is acceptable.
    pub memory_type_bits: u32,
}

/// Native buffer creation parameters.
#[derive(Debug, Clone, Default)]
pub struct BufferCreateInfo {
    pub size: u64,
    pub usage: BufferUsage,
    /// Queue families sharing the buffer. Empty or a single family means exclusive.
    pub queue_families: Vec<u32>,
}

/// Native image creation parameters.
#[derive(Debug, Clone, Copy)]
pub struct ImageCreateInfo {
    pub format: Format,
    pub extent: Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub usage: ImageUsage,
    /// Create the image with the "may alias" flag so its memory can be shared.
    pub allow_aliasing: bool,
}

/// Native image view creation parameters.
#[derive(Debug, Clone, Copy)]
pub struct ImageViewCreateInfo {
    pub format: Format,
    pub mip_levels: u32,
    pub array_layers: u32,
    /// Depth aspect instead of color aspect.
    pub depth_aspect: bool,
    /// 3D view
    pub volume: bool,
}

impl ImageViewCreateInfo {
    /// Full-resource view matching an image's creation parameters.
    pub fn for_image(info: &ImageCreateInfo) -> Self {
        Self {
            format: info.format,
            mip_levels: info.mip_levels,
            array_layers: info.array_layers,
            depth_aspect: info.format.is_depth(),
            volume: info.extent.depth > 1,
        }
    }
}

/// Core device trait - every native object the crate touches goes through here.
///
/// This trait is object-safe for use with `Arc<dyn DeviceContext>`.
pub trait DeviceContext: Send + Sync {
    /// Whether the device is ready to create objects.
    fn is_initialized(&self) -> bool;

    /// Property flags of each memory type, indexed by memory type index.
    fn memory_types(&self) -> &[MemoryPropertyFlags];

    /// Create a native buffer (no memory bound).
    fn create_buffer(&self, info: &BufferCreateInfo) -> Result<RawBuffer, DeviceError>;

    /// Memory requirements of a native buffer.
    fn buffer_memory_requirements(&self, buffer: RawBuffer) -> MemoryRequirements;

    /// Bind memory to a buffer at the given offset.
    fn bind_buffer_memory(&self, buffer: RawBuffer, memory: RawMemory, offset: u64) -> Result<(), DeviceError>;

    /// Destroy a native buffer.
    fn destroy_buffer(&self, buffer: RawBuffer);

    /// Allocate a block of device memory from a memory type.
    fn allocate_memory(&self, size: u64, memory_type_index: u32) -> Result<RawMemory, DeviceError>;

    /// Free a block of device memory.
    fn free_memory(&self, memory: RawMemory);

    /// Map a range of host-visible memory.
    fn map_memory(&self, memory: RawMemory, offset: u64, size: u64) -> Result<NonNull<u8>, DeviceError>;

    /// Unmap previously mapped memory.
    fn unmap_memory(&self, memory: RawMemory);

    /// Create a native image (no memory bound).
    fn create_image(&self, info: &ImageCreateInfo) -> Result<RawImage, DeviceError>;

    /// Memory requirements of a native image.
    fn image_memory_requirements(&self, image: RawImage) -> MemoryRequirements;

    /// Bind memory to an image at the given offset.
    fn bind_image_memory(&self, image: RawImage, memory: RawMemory, offset: u64) -> Result<(), DeviceError>;

    /// Destroy a native image.
    fn destroy_image(&self, image: RawImage);

    /// Create a view over an image.
    fn create_image_view(&self, image: RawImage, info: &ImageViewCreateInfo) -> Result<RawImageView, DeviceError>;

    /// Destroy an image view.
    fn destroy_image_view(&self, view: RawImageView);
}

/// Sentinel returned by [`find_memory_type_index`] when nothing matches.
pub const MEMORY_TYPE_NOT_FOUND: u32 = u32::MAX;

/// First memory type allowed by `type_bits` whose flags contain `required`.
///
/// This is first-fit, not best-fit. Returns [`MEMORY_TYPE_NOT_FOUND`] otherwise.
pub fn find_memory_type_index(
    memory_types: &[MemoryPropertyFlags],
    type_bits: u32,
    required: MemoryPropertyFlags,
) -> u32 {
    memory_types
        .iter()
        .enumerate()
        .take(32)
        .find(|(i, flags)| type_bits & (1 << i) != 0 && flags.contains(required))
        .map_or(MEMORY_TYPE_NOT_FOUND, |(i, _)| i as u32)
}

/// A memory range handed out by a [`MemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAllocation {
    pub memory: RawMemory,
    pub offset: u64,
    pub size: u64,
    /// Set when the backend keeps this allocation persistently mapped.
    pub mapped: Option<NonNull<u8>>,
    /// Backend-private identifier used to free the allocation.
    pub id: u64,
}

// The mapped pointer is only dereferenced on the owning thread; the struct is plain data.
unsafe impl Send for DeviceAllocation {}
unsafe impl Sync for DeviceAllocation {}

/// What a [`MemoryBackend`] allocation will be bound to.
///
/// Buffers are linear resources; transient images are optimal-tiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Image,
}

impl ResourceKind {
    /// Whether the bound resource has linear layout.
    pub const fn is_linear(self) -> bool {
        matches!(self, ResourceKind::Buffer)
    }
}

/// Memory allocation strategy, chosen once at construction time.
pub trait MemoryBackend: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Allocate memory satisfying `requirements` with at least `required` properties,
    /// to be bound to a resource of the given `kind`.
    fn allocate(
        &self,
        device: &dyn DeviceContext,
        requirements: &MemoryRequirements,
        required: MemoryPropertyFlags,
        kind: ResourceKind,
    ) -> Result<DeviceAllocation, DeviceError>;

    /// Free an allocation produced by [`MemoryBackend::allocate`].
    fn free(&self, device: &dyn DeviceContext, allocation: DeviceAllocation);

    /// Whether this backend already aliases transient images on its own.
    ///
    /// When true the arena never builds alias blocks itself.
    fn aliases_internally(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_memory_type_is_first_fit() {
        let types = [
            MemoryPropertyFlags::DEVICE_LOCAL,
            MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
            MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT | MemoryPropertyFlags::HOST_CACHED,
        ];

        let host = MemoryPropertyFlags::HOST_VISIBLE;
        assert_eq!(find_memory_type_index(&types, 0b111, host), 1);
        assert_eq!(find_memory_type_index(&types, 0b100, host), 2);
        assert_eq!(find_memory_type_index(&types, 0b001, host), MEMORY_TYPE_NOT_FOUND);
        assert_eq!(find_memory_type_index(&types, 0b111, MemoryPropertyFlags::empty()), 0);
    }

    #[test]
    fn test_flag_contains() {
        let usage = BufferUsage::UNIFORM_BUFFER | BufferUsage::TRANSFER_SRC;
        assert!(usage.contains(BufferUsage::UNIFORM_BUFFER));
        assert!(!usage.contains(BufferUsage::VERTEX_BUFFER));
        assert!(BufferUsage::empty().is_empty());
    }

    #[test]
    fn test_format_helpers() {
        assert!(Format::UNDEFINED.is_undefined());
        assert!(Format::D32_SFLOAT.is_depth());
        assert!(!Format::R8G8B8A8_UNORM.is_depth());
        assert_eq!(Format::R16G16B16A16_SFLOAT.bytes_per_texel(), 8);
        assert_eq!(Extent3D::d2(256, 256).texel_count(), 65536);
        let huge = Extent3D {
            width: u32::MAX,
            height: u32::MAX,
            depth: u32::MAX,
        };
        assert_eq!(huge.texel_count(), u64::MAX);
    }
}
