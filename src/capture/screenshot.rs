//! Primary monitor capture using the Windows Graphics Capture API.
//!
//! `WgcScreen` holds the D3D11 device and the capture item for the primary
//! monitor. Each `open()` starts a capture session; the session and its
//! frame pool are closed when the returned handle is dropped.

use anyhow::{anyhow, bail, Context, Result};
use image::RgbaImage;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use windows::core::Interface;
use windows::Foundation::TypedEventHandler;
use windows::Graphics::Capture::{
    Direct3D11CaptureFrame, Direct3D11CaptureFramePool, GraphicsCaptureItem, GraphicsCaptureSession,
};
use windows::Graphics::DirectX::Direct3D11::IDirect3DDevice;
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Win32::Foundation::POINT;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAP_READ, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Gdi::{MonitorFromPoint, MONITOR_DEFAULTTOPRIMARY};
use windows::Win32::System::WinRT::Direct3D11::{
    CreateDirect3D11DeviceFromDXGIDevice, IDirect3DDxgiInterfaceAccess,
};
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;

use super::{crop_frame, CaptureHandle, ScreenCapture};
use crate::layout::{Region, Resolution};

const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

pub struct WgcScreen {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    d3d_device: IDirect3DDevice,
    item: GraphicsCaptureItem,
    resolution: Resolution,
}

impl WgcScreen {
    /// Prepares capture of the primary monitor.
    pub fn primary() -> Result<Self> {
        let (device, context) = create_d3d11_device()?;
        let d3d_device = create_direct3d_device(&device)?;
        let item = create_primary_monitor_item()?;
        let size = item.Size()?;
        let resolution = Resolution::new(size.Width.max(0) as u32, size.Height.max(0) as u32)?;
        debug!("Capture item created for primary monitor ({})", resolution);

        Ok(Self {
            device,
            context,
            d3d_device,
            item,
            resolution,
        })
    }
}

impl ScreenCapture for WgcScreen {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn open(&mut self) -> Result<Box<dyn CaptureHandle>> {
        let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &self.d3d_device,
            DirectXPixelFormat::B8G8R8A8UIntNormalized,
            2,
            self.item.Size()?,
        )?;
        let session = frame_pool.CreateCaptureSession(&self.item)?;
        // Not supported before Windows 10 2004
        let _ = session.SetIsCursorCaptureEnabled(false);

        let frame_arrived = Arc::new(AtomicBool::new(false));
        let flag = frame_arrived.clone();
        frame_pool.FrameArrived(&TypedEventHandler::new(
            move |_pool: &Option<Direct3D11CaptureFramePool>, _| {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            },
        ))?;
        session.StartCapture()?;

        Ok(Box::new(WgcHandle {
            device: self.device.clone(),
            context: self.context.clone(),
            frame_pool,
            session,
            frame_arrived,
            frame: None,
        }))
    }
}

struct WgcHandle {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    frame_pool: Direct3D11CaptureFramePool,
    session: GraphicsCaptureSession,
    frame_arrived: Arc<AtomicBool>,
    /// Last full frame, reused until a newer one arrives
    frame: Option<RgbaImage>,
}

impl WgcHandle {
    /// Takes the newest queued frame, if any.
    fn latest_frame(&self) -> Option<Direct3D11CaptureFrame> {
        let mut latest = None;
        while let Ok(frame) = self.frame_pool.TryGetNextFrame() {
            latest = Some(frame);
        }
        latest
    }

    fn refresh(&mut self) -> Result<()> {
        if self.frame.is_none() {
            let start = Instant::now();
            while !self.frame_arrived.load(Ordering::SeqCst) {
                if start.elapsed() > FIRST_FRAME_TIMEOUT {
                    bail!("Timeout waiting for the first frame");
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }

        if self.frame_arrived.swap(false, Ordering::SeqCst) {
            if let Some(frame) = self.latest_frame() {
                self.frame = Some(self.read_frame(&frame)?);
            }
        }
        Ok(())
    }

    /// Copies a frame to the CPU as RGBA.
    fn read_frame(&self, frame: &Direct3D11CaptureFrame) -> Result<RgbaImage> {
        let surface = frame.Surface()?;
        let access: IDirect3DDxgiInterfaceAccess = surface.cast()?;
        let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.Width,
            Height: desc.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desc.Format,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: Default::default(),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: Default::default(),
        };
        let staging_texture = unsafe {
            let mut staging: Option<ID3D11Texture2D> = None;
            self.device
                .CreateTexture2D(&staging_desc, None, Some(&mut staging))?;
            staging.ok_or_else(|| anyhow!("Failed to create staging texture"))?
        };
        let staging_resource = staging_texture.cast::<ID3D11Resource>()?;

        unsafe {
            self.context
                .CopyResource(&staging_resource, &texture.cast::<ID3D11Resource>()?);
        }

        let mapped = unsafe {
            let mut mapped = Default::default();
            self.context
                .Map(&staging_resource, 0, D3D11_MAP_READ, 0, Some(&mut mapped))?;
            mapped
        };

        let row_pitch = mapped.RowPitch as usize;
        let src = unsafe {
            std::slice::from_raw_parts(mapped.pData as *const u8, row_pitch * desc.Height as usize)
        };

        // BGRA -> RGBA
        let mut img = RgbaImage::new(desc.Width, desc.Height);
        for (y, row) in img.rows_mut().enumerate() {
            let src_row = &src[y * row_pitch..];
            for (x, pixel) in row.enumerate() {
                let offset = x * 4;
                pixel.0 = [
                    src_row[offset + 2],
                    src_row[offset + 1],
                    src_row[offset],
                    src_row[offset + 3],
                ];
            }
        }

        unsafe { self.context.Unmap(&staging_resource, 0) };
        Ok(img)
    }
}

impl CaptureHandle for WgcHandle {
    fn grab(&mut self, region: Region) -> Result<RgbaImage> {
        self.refresh()?;
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| anyhow!("No frame captured yet"))?;
        Ok(crop_frame(frame, region))
    }
}

impl Drop for WgcHandle {
    fn drop(&mut self) {
        let _ = self.session.Close();
        let _ = self.frame_pool.Close();
    }
}

/// Creates a Direct3D 11 device and immediate context.
fn create_d3d11_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }

    Ok((
        device.ok_or_else(|| anyhow!("Failed to create D3D11 device"))?,
        context.ok_or_else(|| anyhow!("Failed to create D3D11 context"))?,
    ))
}

/// Creates the WinRT Direct3D device wrapper the capture API requires.
fn create_direct3d_device(device: &ID3D11Device) -> Result<IDirect3DDevice> {
    let dxgi_device: windows::Win32::Graphics::Dxgi::IDXGIDevice = device.cast()?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? };
    inspectable
        .cast()
        .context("Failed to cast to IDirect3DDevice")
}

fn create_primary_monitor_item() -> Result<GraphicsCaptureItem> {
    let class_name = windows::core::h!("Windows.Graphics.Capture.GraphicsCaptureItem");
    let interop: IGraphicsCaptureItemInterop = unsafe {
        windows::Win32::System::WinRT::RoGetActivationFactory(class_name)
            .context("Failed to get IGraphicsCaptureItemInterop")?
    };

    let monitor = unsafe { MonitorFromPoint(POINT { x: 0, y: 0 }, MONITOR_DEFAULTTOPRIMARY) };
    unsafe {
        interop
            .CreateForMonitor(monitor)
            .context("Failed to create capture item for the primary monitor")
    }
}
