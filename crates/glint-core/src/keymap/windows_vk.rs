//! Windows Virtual-Key (VK) codes used by the agent.
//!
//! # What is a Windows Virtual Key (VK) code? (for beginners)
//!
//! Windows assigns each keyboard key a number called a "Virtual Key code".
//! These are defined in `<winuser.h>` and named `VK_*`.  Low-level keyboard
//! hooks report the *sided* codes for modifiers (`VK_LMENU`, `VK_RSHIFT`, ...)
//! while some synthetic sources report the generic ones (`VK_MENU`,
//! `VK_SHIFT`), so both are listed here.
//!
//! Reference: https://learn.microsoft.com/windows/win32/inputdev/virtual-key-codes

pub const VK_BACK: u32 = 0x08;
pub const VK_TAB: u32 = 0x09;
pub const VK_RETURN: u32 = 0x0D;
pub const VK_SHIFT: u32 = 0x10;
pub const VK_MENU: u32 = 0x12;
pub const VK_ESCAPE: u32 = 0x1B;
pub const VK_LSHIFT: u32 = 0xA0;
pub const VK_RSHIFT: u32 = 0xA1;
pub const VK_LMENU: u32 = 0xA4;
pub const VK_RMENU: u32 = 0xA5;
/// The `` ` `` / `~` key on US layouts; default replay trigger.
pub const VK_OEM_3: u32 = 0xC0;
