//! Mouse and keyboard input.
//!
//! `InputDriver` is the raw device seam. `Mouse` wraps a driver and tracks
//! whether the left button is currently held, so a pause can always release it.

use anyhow::Result;
use std::time::Duration;

use super::cancel::CancelToken;
use crate::layout::Point;

const CLICK_HOLD: Duration = Duration::from_millis(50);

pub trait InputDriver: Send {
    /// Moves the cursor to an absolute screen position.
    fn move_to(&mut self, point: Point) -> Result<()>;
    fn left_down(&mut self) -> Result<()>;
    fn left_up(&mut self) -> Result<()>;
    /// Presses and releases one virtual key.
    fn tap_key(&mut self, vk: u16) -> Result<()>;
}

pub struct Mouse {
    driver: Box<dyn InputDriver>,
    held: bool,
}

impl Mouse {
    pub fn new(driver: Box<dyn InputDriver>) -> Self {
        Self {
            driver,
            held: false,
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn press(&mut self) -> Result<()> {
        self.driver.left_down()?;
        self.held = true;
        Ok(())
    }

    pub fn release(&mut self) -> Result<()> {
        self.held = false;
        self.driver.left_up()
    }

    /// Releases the button only if this wrapper pressed it.
    pub fn release_if_held(&mut self) -> Result<()> {
        if self.held {
            self.release()?;
        }
        Ok(())
    }

    /// Short click at the current cursor position.
    ///
    /// The button is released even when the hold is interrupted.
    pub fn click(&mut self, cancel: &CancelToken) -> Result<()> {
        self.press()?;
        let waited = cancel.sleep(CLICK_HOLD);
        self.release()?;
        Ok(waited?)
    }

    pub fn click_at(&mut self, point: Point, cancel: &CancelToken) -> Result<()> {
        self.driver.move_to(point)?;
        cancel.sleep(CLICK_HOLD)?;
        self.click(cancel)
    }

    pub fn tap_key(&mut self, vk: u16) -> Result<()> {
        self.driver.tap_key(vk)
    }
}

#[cfg(windows)]
pub use self::send_input::SendInputDriver;

#[cfg(windows)]
mod send_input {
    use anyhow::{bail, Result};
    use std::time::Duration;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
        KEYEVENTF_KEYUP, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEEVENTF_MOVE, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    use super::InputDriver;
    use crate::layout::Point;

    const KEY_HOLD: Duration = Duration::from_millis(50);

    /// Hardware-level input through `SendInput`. Moves the real cursor.
    pub struct SendInputDriver;

    fn send(input: INPUT) -> Result<()> {
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            bail!("SendInput was blocked");
        }
        Ok(())
    }

    fn mouse(flags: MOUSE_EVENT_FLAGS, dx: i32, dy: i32) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    dwFlags: flags,
                    ..Default::default()
                },
            },
        }
    }

    fn key(vk: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(vk),
                    dwFlags: flags,
                    ..Default::default()
                },
            },
        }
    }

    impl InputDriver for SendInputDriver {
        fn move_to(&mut self, point: Point) -> Result<()> {
            let screen_width = unsafe { GetSystemMetrics(SM_CXSCREEN) }.max(1);
            let screen_height = unsafe { GetSystemMetrics(SM_CYSCREEN) }.max(1);

            // MOUSEEVENTF_ABSOLUTE expects 0..=65535
            let norm_x = ((point.x as i64 * 65535) / screen_width as i64) as i32;
            let norm_y = ((point.y as i64 * 65535) / screen_height as i64) as i32;

            send(mouse(MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE, norm_x, norm_y))
        }

        fn left_down(&mut self) -> Result<()> {
            send(mouse(MOUSEEVENTF_LEFTDOWN, 0, 0))
        }

        fn left_up(&mut self) -> Result<()> {
            send(mouse(MOUSEEVENTF_LEFTUP, 0, 0))
        }

        fn tap_key(&mut self, vk: u16) -> Result<()> {
            send(key(vk, KEYBD_EVENT_FLAGS(0)))?;
            std::thread::sleep(KEY_HOLD);
            send(key(vk, KEYEVENTF_KEYUP))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::cancel::Interrupted;
    use crate::test_support::{FakeInput, InputEvent};

    #[test]
    fn test_release_if_held_only_after_press() {
        let input = FakeInput::default();
        let mut mouse = Mouse::new(Box::new(input.clone()));

        mouse.release_if_held().unwrap();
        assert!(input.events().is_empty());

        mouse.press().unwrap();
        assert!(mouse.is_held());
        mouse.release_if_held().unwrap();
        assert!(!mouse.is_held());
        assert_eq!(input.events(), vec![InputEvent::LeftDown, InputEvent::LeftUp]);
    }

    #[test]
    fn test_interrupted_click_still_releases() {
        let input = FakeInput::default();
        let mut mouse = Mouse::new(Box::new(input.clone()));
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = mouse.click(&cancel).unwrap_err();
        assert!(err.is::<Interrupted>());
        assert!(!mouse.is_held());
        assert_eq!(input.events(), vec![InputEvent::LeftDown, InputEvent::LeftUp]);
    }

    #[test]
    fn test_click_at_moves_first() {
        let input = FakeInput::default();
        let mut mouse = Mouse::new(Box::new(input.clone()));

        mouse.click_at(Point::new(10, 20), &CancelToken::new()).unwrap();
        assert_eq!(
            input.events(),
            vec![
                InputEvent::MoveTo(Point::new(10, 20)),
                InputEvent::LeftDown,
                InputEvent::LeftUp
            ]
        );
    }
}
