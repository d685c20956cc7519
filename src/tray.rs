//! Notify icon, context menu and the global start/pause hotkey.
//!
//! Everything here runs on the main thread inside the Win32 message loop.
//! The window procedure only talks to the fishing actor through its
//! `Controller`; settings changed from the menu are saved to `config.json`
//! and forwarded as `Command::UpdateConfig`.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use windows::core::{w, HSTRING, PCWSTR};
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, POINT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL,
    MOD_NOREPEAT, MOD_SHIFT, VK_CONTROL, VK_MENU, VK_SHIFT,
};
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NIM_MODIFY,
    NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CallNextHookEx, CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu,
    DestroyWindow, DispatchMessageW, GetCursorPos, GetMessageW, LoadIconW, PostMessageW,
    PostQuitMessage, RegisterClassW, SetForegroundWindow, SetWindowsHookExW, TrackPopupMenu,
    TranslateMessage, UnhookWindowsHookEx, CW_USEDEFAULT, HHOOK, HMENU, IDI_APPLICATION,
    MENU_ITEM_FLAGS, MF_CHECKED, MF_GRAYED, MF_POPUP, MF_SEPARATOR, MF_STRING, MF_UNCHECKED, MSG,
    MSLLHOOKSTRUCT, TPM_BOTTOMALIGN, TPM_LEFTALIGN, TPM_RIGHTBUTTON, WH_MOUSE_LL, WM_APP,
    WM_COMMAND, WM_DESTROY, WM_HOTKEY, WM_LBUTTONDBLCLK, WM_RBUTTONUP, WM_USER, WM_XBUTTONDOWN,
    WNDCLASSW, WS_OVERLAPPEDWINDOW,
};

use crate::automation::hotkey::{SideButton, Trigger};
use crate::automation::{AppConfig, Command, Controller, ExtendTimePolicy, Hotkey, SharedStatus};

const HOTKEY_ID: i32 = 1;
const WM_TRAYICON: u32 = WM_USER + 1;
/// Posted by the mouse hook when the side-button hotkey fires.
const WM_MOUSE_HOTKEY: u32 = WM_APP + 1;

const XBUTTON1: u32 = 0x0001;
const XBUTTON2: u32 = 0x0002;

// Menu item IDs
const MENU_TOGGLE: usize = 1001;
const MENU_EXTEND_ACCEPT: usize = 1002;
const MENU_EXTEND_DECLINE: usize = 1003;
const MENU_RECORD_FISH: usize = 1004;
const MENU_CLEAR_RECORDS: usize = 1005;
const MENU_RELOAD_CONFIG: usize = 1006;
const MENU_EXIT: usize = 1007;

/// State shared with the window procedure and the mouse hook.
struct TrayContext {
    controller: Controller,
    status: Arc<SharedStatus>,
    config: Mutex<AppConfig>,
    config_path: PathBuf,
    hotkey: Mutex<Hotkey>,
}

static APP: OnceLock<TrayContext> = OnceLock::new();
static MAIN_HWND: AtomicPtr<c_void> = AtomicPtr::new(std::ptr::null_mut());

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs the tray until Exit is chosen.
pub fn run(
    controller: Controller,
    status: Arc<SharedStatus>,
    config: AppConfig,
    config_path: PathBuf,
) -> Result<()> {
    let hotkey = parse_hotkey(&config.hotkey);
    let context = TrayContext {
        controller,
        status,
        config: Mutex::new(config),
        config_path,
        hotkey: Mutex::new(hotkey),
    };
    if APP.set(context).is_err() {
        return Err(anyhow!("Tray is already running"));
    }

    let hwnd = create_message_window()?;
    MAIN_HWND.store(hwnd.0, Ordering::SeqCst);
    add_tray_icon(hwnd, &hotkey)?;

    if let Err(e) = register_hotkey(hwnd, &hotkey) {
        warn!("Could not register hotkey {}: {:#}", hotkey, e);
    }
    let hook = unsafe {
        let module = GetModuleHandleW(None)?;
        SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook), HINSTANCE::from(module), 0)
            .context("Failed to install mouse hook")?
    };

    info!("PartyFish started. {} starts/pauses fishing", hotkey);
    info!("Right-click the tray icon for options");

    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, HWND::default(), 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        let _ = UnhookWindowsHookEx(hook);
        let _ = UnregisterHotKey(hwnd, HOTKEY_ID);
        remove_tray_icon(hwnd);
        let _ = DestroyWindow(hwnd);
    }

    Ok(())
}

/// Falls back to the default hotkey when the configured one does not parse.
fn parse_hotkey(text: &str) -> Hotkey {
    text.parse().unwrap_or_else(|e| {
        warn!("Invalid hotkey '{}' ({}). Using {}.", text, e, Hotkey::default());
        Hotkey::default()
    })
}

fn modifier_flags(hotkey: &Hotkey) -> HOT_KEY_MODIFIERS {
    let mut flags = MOD_NOREPEAT;
    if hotkey.modifiers.ctrl {
        flags |= MOD_CONTROL;
    }
    if hotkey.modifiers.alt {
        flags |= MOD_ALT;
    }
    if hotkey.modifiers.shift {
        flags |= MOD_SHIFT;
    }
    flags
}

/// Registers keyboard triggers. Mouse triggers are handled by the hook.
fn register_hotkey(hwnd: HWND, hotkey: &Hotkey) -> Result<()> {
    let Trigger::Key(vk) = hotkey.trigger else {
        return Ok(());
    };
    unsafe { RegisterHotKey(hwnd, HOTKEY_ID, modifier_flags(hotkey), vk as u32)? };
    Ok(())
}

fn key_down(vk: u16) -> bool {
    unsafe { GetAsyncKeyState(vk as i32) as u16 & 0x8000 != 0 }
}

/// Whether exactly the hotkey's modifiers are held.
fn modifiers_match(hotkey: &Hotkey) -> bool {
    key_down(VK_CONTROL.0) == hotkey.modifiers.ctrl
        && key_down(VK_MENU.0) == hotkey.modifiers.alt
        && key_down(VK_SHIFT.0) == hotkey.modifiers.shift
}

unsafe extern "system" fn mouse_hook(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    unsafe {
        if code >= 0 && wparam.0 as u32 == WM_XBUTTONDOWN {
            let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
            let button = match info.mouseData >> 16 {
                XBUTTON1 => Some(SideButton::Mouse4),
                XBUTTON2 => Some(SideButton::Mouse5),
                _ => None,
            };
            if let (Some(button), Some(app)) = (button, APP.get()) {
                let hotkey = *lock(&app.hotkey);
                if hotkey.trigger == Trigger::Mouse(button) && modifiers_match(&hotkey) {
                    let hwnd = HWND(MAIN_HWND.load(Ordering::SeqCst));
                    let _ = PostMessageW(hwnd, WM_MOUSE_HOTKEY, WPARAM(0), LPARAM(0));
                }
            }
        }
        CallNextHookEx(HHOOK::default(), code, wparam, lparam)
    }
}

fn create_message_window() -> Result<HWND> {
    unsafe {
        let hinstance = GetModuleHandleW(None)?;
        let class_name = w!("PartyFishTrayClass");

        let wc = WNDCLASSW {
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            lpszClassName: class_name,
            ..Default::default()
        };

        if RegisterClassW(&wc) == 0 {
            return Err(anyhow!("Failed to register window class"));
        }

        let hwnd = CreateWindowExW(
            Default::default(),
            class_name,
            w!("PartyFish"),
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            None,
            None,
            hinstance,
            None,
        )?;

        Ok(hwnd)
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe {
        match msg {
            WM_HOTKEY if wparam.0 as i32 == HOTKEY_ID => {
                send(Command::Toggle);
                LRESULT(0)
            }
            WM_MOUSE_HOTKEY => {
                send(Command::Toggle);
                LRESULT(0)
            }
            WM_TRAYICON => {
                match (lparam.0 & 0xFFFF) as u32 {
                    WM_RBUTTONUP => show_context_menu(hwnd),
                    WM_LBUTTONDBLCLK => send(Command::Toggle),
                    _ => {}
                }
                LRESULT(0)
            }
            WM_COMMAND => {
                handle_menu(hwnd, wparam.0 & 0xFFFF);
                LRESULT(0)
            }
            WM_DESTROY => {
                PostQuitMessage(0);
                LRESULT(0)
            }
            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }
}

fn send(command: Command) {
    let Some(app) = APP.get() else {
        return;
    };
    if let Err(e) = app.controller.send(command) {
        warn!("{:#}", e);
    }
}

fn handle_menu(hwnd: HWND, id: usize) {
    let Some(app) = APP.get() else {
        return;
    };
    match id {
        MENU_TOGGLE => send(Command::Toggle),
        MENU_EXTEND_ACCEPT => update_config(app, |c| c.extend_time = ExtendTimePolicy::Accept),
        MENU_EXTEND_DECLINE => update_config(app, |c| c.extend_time = ExtendTimePolicy::Decline),
        MENU_RECORD_FISH => update_config(app, |c| c.record_fish = !c.record_fish),
        MENU_CLEAR_RECORDS => send(Command::ClearRecords),
        MENU_RELOAD_CONFIG => reload_config(app, hwnd),
        MENU_EXIT => {
            info!("Exit requested");
            send(Command::Shutdown);
            unsafe { PostQuitMessage(0) };
        }
        _ => {}
    }
}

/// Applies a menu change, saves it and forwards the new settings.
fn update_config(app: &TrayContext, change: impl FnOnce(&mut AppConfig)) {
    let config = {
        let mut config = lock(&app.config);
        change(&mut config);
        config.clone()
    };
    if let Err(e) = config.save(&app.config_path) {
        warn!("Failed to save config: {:#}", e);
    }
    info!(
        "Settings changed: extend time {:?}, record fish {}",
        config.extend_time, config.record_fish
    );
    send(Command::UpdateConfig(Box::new(config)));
}

fn reload_config(app: &TrayContext, hwnd: HWND) {
    let config = AppConfig::load(&app.config_path);
    let hotkey = parse_hotkey(&config.hotkey);

    let previous = std::mem::replace(&mut *lock(&app.hotkey), hotkey);
    if previous != hotkey {
        unsafe {
            let _ = UnregisterHotKey(hwnd, HOTKEY_ID);
        }
        if let Err(e) = register_hotkey(hwnd, &hotkey) {
            warn!("Could not register hotkey {}: {:#}", hotkey, e);
        }
        set_tooltip(hwnd, &hotkey);
        info!("Hotkey changed to {}", hotkey);
    }

    *lock(&app.config) = config.clone();
    info!("Config reloaded");
    send(Command::UpdateConfig(Box::new(config)));
}

fn tooltip(hotkey: &Hotkey) -> String {
    format!("PartyFish ({})", hotkey)
}

fn notify_icon_data(hwnd: HWND) -> NOTIFYICONDATAW {
    NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: 1,
        ..Default::default()
    }
}

fn copy_tip(nid: &mut NOTIFYICONDATAW, text: &str) {
    let wide: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();
    let len = wide.len().min(nid.szTip.len());
    nid.szTip[..len].copy_from_slice(&wide[..len]);
}

fn add_tray_icon(hwnd: HWND, hotkey: &Hotkey) -> Result<()> {
    unsafe {
        let mut nid = NOTIFYICONDATAW {
            uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
            uCallbackMessage: WM_TRAYICON,
            hIcon: LoadIconW(None, IDI_APPLICATION)?,
            ..notify_icon_data(hwnd)
        };
        copy_tip(&mut nid, &tooltip(hotkey));

        if !Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
            return Err(anyhow!("Failed to add tray icon"));
        }
        Ok(())
    }
}

fn set_tooltip(hwnd: HWND, hotkey: &Hotkey) {
    let mut nid = NOTIFYICONDATAW {
        uFlags: NIF_TIP,
        ..notify_icon_data(hwnd)
    };
    copy_tip(&mut nid, &tooltip(hotkey));
    unsafe {
        let _ = Shell_NotifyIconW(NIM_MODIFY, &nid);
    }
}

fn remove_tray_icon(hwnd: HWND) {
    unsafe {
        let _ = Shell_NotifyIconW(NIM_DELETE, &notify_icon_data(hwnd));
    }
}

fn checked(on: bool) -> MENU_ITEM_FLAGS {
    if on {
        MF_STRING | MF_CHECKED
    } else {
        MF_STRING | MF_UNCHECKED
    }
}

fn append(menu: HMENU, flags: MENU_ITEM_FLAGS, id: usize, text: &str) {
    let text = HSTRING::from(text);
    unsafe {
        let _ = AppendMenuW(menu, flags, id, PCWSTR(text.as_ptr()));
    }
}

fn show_context_menu(hwnd: HWND) {
    let Some(app) = APP.get() else {
        return;
    };
    let (extend_time, record_fish) = {
        let config = lock(&app.config);
        (config.extend_time, config.record_fish)
    };
    let hotkey = *lock(&app.hotkey);

    unsafe {
        let (Ok(menu), Ok(extend_menu)) = (CreatePopupMenu(), CreatePopupMenu()) else {
            warn!("Failed to create tray menu");
            return;
        };

        let toggle = if app.status.is_stopped() {
            append(menu, MF_STRING | MF_GRAYED, MENU_TOGGLE, "Fishing unavailable");
            None
        } else if app.status.is_running() {
            Some(format!("Pause ({})", hotkey))
        } else {
            Some(format!("Start ({})", hotkey))
        };
        if let Some(label) = toggle {
            append(menu, MF_STRING, MENU_TOGGLE, &label);
        }
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, None);

        append(
            extend_menu,
            checked(extend_time == ExtendTimePolicy::Accept),
            MENU_EXTEND_ACCEPT,
            "Accept",
        );
        append(
            extend_menu,
            checked(extend_time == ExtendTimePolicy::Decline),
            MENU_EXTEND_DECLINE,
            "Decline",
        );
        append(menu, MF_STRING | MF_POPUP, extend_menu.0 as usize, "Extend time");
        append(menu, checked(record_fish), MENU_RECORD_FISH, "Record fish");
        append(menu, MF_STRING, MENU_CLEAR_RECORDS, "Clear fish records");
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, None);

        append(menu, MF_STRING, MENU_RELOAD_CONFIG, "Reload config");
        append(menu, MF_STRING, MENU_EXIT, "Exit");

        let mut pt = POINT::default();
        let _ = GetCursorPos(&mut pt);

        // Required for the menu to close when clicking elsewhere
        let _ = SetForegroundWindow(hwnd);

        let _ = TrackPopupMenu(
            menu,
            TPM_BOTTOMALIGN | TPM_LEFTALIGN | TPM_RIGHTBUTTON,
            pt.x,
            pt.y,
            0,
            hwnd,
            None,
        );

        // Destroys the submenu too
        let _ = DestroyMenu(menu);
    }
}
