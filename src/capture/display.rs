use anyhow::Result;
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

use crate::layout::Resolution;

/// Physical size of the primary display.
///
/// Needs a DPI-aware process (see the manifest); otherwise Windows reports
/// the scaled size.
pub fn primary_resolution() -> Result<Resolution> {
    let width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
    let height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
    Ok(Resolution::new(width.max(0) as u32, height.max(0) as u32)?)
}
