//! Vulkan device context

use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use ash::vk;
use ash::vk::Handle;

use super::super::traits::*;

/// `DeviceContext` over an `ash` logical device.
///
/// The caller keeps ownership of the instance and device; this type never destroys them.
pub struct VulkanDevice {
    device: ash::Device,
    memory_types: Vec<MemoryPropertyFlags>,
    initialized: AtomicBool,
}

impl VulkanDevice {
    /// Wrap a logical device created from `physical_device`.
    pub fn new(instance: &ash::Instance, physical_device: vk::PhysicalDevice, device: ash::Device) -> Self {
        // SAFETY: physical_device was enumerated from this instance.
        let properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let memory_types = properties.memory_types[..properties.memory_type_count as usize]
            .iter()
            .map(|t| MemoryPropertyFlags {
                bits: t.property_flags.as_raw(),
            })
            .collect();

        Self {
            device,
            memory_types,
            initialized: AtomicBool::new(true),
        }
    }

    /// The wrapped logical device.
    pub fn raw(&self) -> &ash::Device {
        &self.device
    }

    /// Stop accepting creation calls, e.g. before the device is destroyed.
    pub fn mark_lost(&self) {
        self.initialized.store(false, Ordering::Release);
    }
}

fn map_result(result: vk::Result) -> DeviceError {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => DeviceError::OutOfMemory,
        vk::Result::ERROR_MEMORY_MAP_FAILED => DeviceError::MapFailed,
        vk::Result::ERROR_DEVICE_LOST => DeviceError::NotInitialized,
        other => DeviceError::Backend(format!("{:?}", other)),
    }
}

fn from_vk_requirements(req: vk::MemoryRequirements) -> MemoryRequirements {
    MemoryRequirements {
        size: req.size,
        alignment: req.alignment,
        memory_type_bits: req.memory_type_bits,
    }
}

impl DeviceContext for VulkanDevice {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn memory_types(&self) -> &[MemoryPropertyFlags] {
        &self.memory_types
    }

    fn create_buffer(&self, info: &BufferCreateInfo) -> Result<RawBuffer, DeviceError> {
        let sharing_mode = if info.queue_families.len() > 1 {
            vk::SharingMode::CONCURRENT
        } else {
            vk::SharingMode::EXCLUSIVE
        };
        let mut create_info = vk::BufferCreateInfo::builder()
            .size(info.size)
            .usage(vk::BufferUsageFlags::from_raw(info.usage.bits))
            .sharing_mode(sharing_mode);
        if sharing_mode == vk::SharingMode::CONCURRENT {
            create_info = create_info.queue_family_indices(&info.queue_families);
        }

        // SAFETY: create_info and the slices it borrows outlive the call.
        let buffer = unsafe { self.device.create_buffer(&create_info, None) }.map_err(map_result)?;
        Ok(RawBuffer(buffer.as_raw()))
    }

    fn buffer_memory_requirements(&self, buffer: RawBuffer) -> MemoryRequirements {
        // SAFETY: buffer was created by this device.
        let req = unsafe { self.device.get_buffer_memory_requirements(vk::Buffer::from_raw(buffer.0)) };
        from_vk_requirements(req)
    }

    fn bind_buffer_memory(&self, buffer: RawBuffer, memory: RawMemory, offset: u64) -> Result<(), DeviceError> {
        // SAFETY: both handles belong to this device.
        unsafe {
            self.device
                .bind_buffer_memory(vk::Buffer::from_raw(buffer.0), vk::DeviceMemory::from_raw(memory.0), offset)
        }
        .map_err(map_result)
    }

    fn destroy_buffer(&self, buffer: RawBuffer) {
        // SAFETY: the caller no longer uses the buffer.
        unsafe { self.device.destroy_buffer(vk::Buffer::from_raw(buffer.0), None) };
    }

    fn allocate_memory(&self, size: u64, memory_type_index: u32) -> Result<RawMemory, DeviceError> {
        if !self.is_initialized() {
            return Err(DeviceError::NotInitialized);
        }
        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(size)
            .memory_type_index(memory_type_index);

        // SAFETY: allocate_info is valid for the call.
        let memory = unsafe { self.device.allocate_memory(&allocate_info, None) }.map_err(map_result)?;
        Ok(RawMemory(memory.as_raw()))
    }

    fn free_memory(&self, memory: RawMemory) {
        // SAFETY: nothing bound to this memory is used after this point.
        unsafe { self.device.free_memory(vk::DeviceMemory::from_raw(memory.0), None) };
    }

    fn map_memory(&self, memory: RawMemory, offset: u64, size: u64) -> Result<NonNull<u8>, DeviceError> {
        // SAFETY: memory belongs to this device and is not already mapped.
        let ptr = unsafe {
            self.device.map_memory(
                vk::DeviceMemory::from_raw(memory.0),
                offset,
                size,
                vk::MemoryMapFlags::empty(),
            )
        }
        .map_err(map_result)?;
        NonNull::new(ptr as *mut u8).ok_or(DeviceError::MapFailed)
    }

    fn unmap_memory(&self, memory: RawMemory) {
        // SAFETY: memory was mapped by map_memory.
        unsafe { self.device.unmap_memory(vk::DeviceMemory::from_raw(memory.0)) };
    }

    fn create_image(&self, info: &ImageCreateInfo) -> Result<RawImage, DeviceError> {
        if !self.is_initialized() {
            return Err(DeviceError::NotInitialized);
        }
        let image_type = if info.extent.depth > 1 {
            vk::ImageType::TYPE_3D
        } else {
            vk::ImageType::TYPE_2D
        };
        let flags = if info.allow_aliasing {
            vk::ImageCreateFlags::ALIAS
        } else {
            vk::ImageCreateFlags::empty()
        };
        let create_info = vk::ImageCreateInfo::builder()
            .flags(flags)
            .image_type(image_type)
            .format(vk::Format::from_raw(info.format.0 as i32))
            .extent(vk::Extent3D {
                width: info.extent.width,
                height: info.extent.height,
                depth: info.extent.depth,
            })
            .mip_levels(info.mip_levels)
            .array_layers(info.array_layers)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::from_raw(info.usage.bits))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        // SAFETY: create_info is valid for the call.
        let image = unsafe { self.device.create_image(&create_info, None) }.map_err(map_result)?;
        Ok(RawImage(image.as_raw()))
    }

    fn image_memory_requirements(&self, image: RawImage) -> MemoryRequirements {
        // SAFETY: image was created by this device.
        let req = unsafe { self.device.get_image_memory_requirements(vk::Image::from_raw(image.0)) };
        from_vk_requirements(req)
    }

    fn bind_image_memory(&self, image: RawImage, memory: RawMemory, offset: u64) -> Result<(), DeviceError> {
        // SAFETY: both handles belong to this device.
        unsafe {
            self.device
                .bind_image_memory(vk::Image::from_raw(image.0), vk::DeviceMemory::from_raw(memory.0), offset)
        }
        .map_err(map_result)
    }

    fn destroy_image(&self, image: RawImage) {
        // SAFETY: the caller no longer uses the image.
        unsafe { self.device.destroy_image(vk::Image::from_raw(image.0), None) };
    }

    fn create_image_view(&self, image: RawImage, info: &ImageViewCreateInfo) -> Result<RawImageView, DeviceError> {
        let view_type = if info.volume {
            vk::ImageViewType::TYPE_3D
        } else if info.array_layers > 1 {
            vk::ImageViewType::TYPE_2D_ARRAY
        } else {
            vk::ImageViewType::TYPE_2D
        };
        let aspect_mask = if info.depth_aspect {
            vk::ImageAspectFlags::DEPTH
        } else {
            vk::ImageAspectFlags::COLOR
        };
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(vk::Image::from_raw(image.0))
            .view_type(view_type)
            .format(vk::Format::from_raw(info.format.0 as i32))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: info.mip_levels,
                base_array_layer: 0,
                layer_count: info.array_layers,
            });

        // SAFETY: the image is live and bound to memory.
        let view = unsafe { self.device.create_image_view(&create_info, None) }.map_err(map_result)?;
        Ok(RawImageView(view.as_raw()))
    }

    fn destroy_image_view(&self, view: RawImageView) {
        // SAFETY: the caller no longer uses the view.
        unsafe { self.device.destroy_image_view(vk::ImageView::from_raw(view.0), None) };
    }
}
