//! Keysym lookup tables, one per modifier context.
//!
//! The values target an X11-keysym VNC server and carry a handful of
//! layout-specific remaps (the deployment keyboard is Spanish); those
//! entries are annotated rather than corrected.

use super::Key;

/// Wire code for a key with no modifier active.
pub fn base_keysym(key: Key) -> Option<u32> {
    use Key::*;
    let code = match key {
        Backspace => 0xff08,
        Tab => 0xff09,
        Clear => 0xff08,
        Return => 0xff0d,
        Pause => 0xff13,
        Escape => 0xff1b,
        Space => 0x20,
        Exclaim => 0x21,
        DoubleQuote => 0x22,
        Hash => 0x23,
        Dollar => 0x24,
        Ampersand => 0x26,
        LeftParen => 0x28,
        RightParen => 0x29,
        Asterisk => 0x2a,
        Plus => 0x2b,
        Comma => 0x2c,
        Minus => 0x2d,
        Period => 0x2e,
        Slash => 0x63, // cedilla on the source layout, send a plain c
        Digit0 => 0x30,
        Digit1 => 0x31,
        Digit2 => 0x32,
        Digit3 => 0x33,
        Digit4 => 0x34,
        Digit5 => 0x35,
        Digit6 => 0x36,
        Digit7 => 0x37,
        Digit8 => 0x38,
        Digit9 => 0x39,
        Colon => 0x3a,
        Less => 0x3c,
        Equals => 0x2b, // plus
        Greater => 0x3e,
        Question => 0x3f,
        At => 0x40,
        LeftBracket => 0x27, // apostrophe
        Backslash => 0x3c,   // less-than
        RightBracket => 0xa1, // inverted exclamation
        Caret => 0x5e,
        Underscore => 0x5f,
        BackQuote => 0x6e, // enye on the source layout, send a plain n
        A => 0x61,
        B => 0x62,
        C => 0x63,
        D => 0x64,
        E => 0x65,
        F => 0x66,
        G => 0x67,
        H => 0x68,
        I => 0x69,
        J => 0x6a,
        K => 0x6b,
        L => 0x6c,
        M => 0x6d,
        N => 0x6e,
        O => 0x6f,
        P => 0x70,
        Q => 0x71,
        R => 0x72,
        S => 0x73,
        T => 0x74,
        U => 0x75,
        V => 0x76,
        W => 0x77,
        X => 0x78,
        Y => 0x79,
        Z => 0x7a,
        Delete => 0xffff,
        Keypad0 => 0x30,
        Keypad1 => 0x31,
        Keypad2 => 0x32,
        Keypad3 => 0x33,
        Keypad4 => 0x34,
        Keypad5 => 0x35,
        Keypad6 => 0x36,
        Keypad7 => 0x37,
        Keypad8 => 0x38,
        Keypad9 => 0x39,
        KeypadPeriod => 0x2e,
        KeypadDivide => 0x2f,
        KeypadMultiply => 0x2a,
        KeypadMinus => 0x2d,
        KeypadPlus => 0x2b,
        KeypadEnter => 0xff0d,
        KeypadEquals => 0x3d,
        ArrowUp => 0xff52,
        ArrowDown => 0xff54,
        ArrowRight => 0xff53,
        ArrowLeft => 0xff51,
        Insert => 0xff63,
        Home => 0xff50,
        End => 0xff57,
        PageUp => 0xff55,
        PageDown => 0x7e, // tilde, not page down
        F1 => 0xffbe,
        F2 => 0xffbf,
        F3 => 0xffc0,
        F4 => 0xffc1,
        F5 => 0xffc2,
        F6 => 0xffc3,
        F7 => 0xffc4,
        F8 => 0xffc5,
        F9 => 0xffc6,
        F10 => 0xffc7,
        F11 => 0xffc8,
        F12 => 0xffc9,
        F13 => 0xffca,
        F14 => 0xffcb,
        F15 => 0xffcc,
        NumLock => 0xff7f,
        CapsLock => 0xffe5, // caps state itself is tracked by the translator
        ScrollLock => 0xff14,
        RightControl => 0xffe4,
        LeftControl => 0xffe3,
        RightAlt => 0xffea,
        LeftAlt => 0xffe9,
        _ => return None,
    };
    Some(code)
}

/// Wire code for a key while Shift is active.
pub fn shift_keysym(key: Key) -> Option<u32> {
    use Key::*;
    let code = match key {
        Digit0 => 0x3d, // equals
        Digit1 => 0x21, // exclamation
        Digit2 => 0x22, // double quote
        Digit3 => 0x2e, // interpunct on the source layout, send a period
        Digit4 => 0x24, // dollar
        Digit5 => 0x25, // percent
        Digit6 => 0x26, // ampersand
        Digit7 => 0x2f, // slash
        Digit8 => 0x28, // left parenthesis
        Digit9 => 0x29, // right parenthesis
        LeftBracket => 0x3f,  // question mark
        RightBracket => 0xbf, // inverted question mark
        Semicolon => 0x5e,    // dead circumflex, send caret
        Equals => 0x2a,       // asterisk
        Quote => 0x22,        // diaeresis, send double quote
        Backslash => 0x3e,    // greater-than
        Minus => 0x5f,        // underscore
        Comma => 0x3b,        // semicolon
        Period => 0x3a,       // colon
        A => 0x41,
        B => 0x42,
        C => 0x43,
        D => 0x44,
        E => 0x45,
        F => 0x46,
        G => 0x47,
        H => 0x48,
        I => 0x49,
        J => 0x4a,
        K => 0x4b,
        L => 0x4c,
        M => 0x4d,
        N => 0x4e,
        O => 0x4f,
        P => 0x50,
        Q => 0x51,
        R => 0x52,
        S => 0x53,
        T => 0x54,
        U => 0x55,
        V => 0x56,
        W => 0x57,
        X => 0x58,
        Y => 0x59,
        Z => 0x5a,
        _ => return None,
    };
    Some(code)
}

/// Wire code for a key while AltGr is active.
pub fn alt_gr_keysym(key: Key) -> Option<u32> {
    use Key::*;
    let code = match key {
        Digit1 => 0x7c, // pipe
        Digit2 => 0x40, // at
        Digit3 => 0x23, // hash
        Digit4 => 0x7e, // tilde
        Semicolon => 0x5b, // left square bracket
        Equals => 0x5d,    // right square bracket
        Quote => 0x7b,     // left curly bracket
        Slash => 0x7d,     // right curly bracket
        Backslash => 0x5c,
        _ => return None,
    };
    Some(code)
}

/// Wire code for a key while Caps Lock is active. Letters only.
pub fn caps_keysym(key: Key) -> Option<u32> {
    use Key::*;
    let code = match key {
        A => 0x41,
        B => 0x42,
        C => 0x43,
        D => 0x44,
        E => 0x45,
        F => 0x46,
        G => 0x47,
        H => 0x48,
        I => 0x49,
        J => 0x4a,
        K => 0x4b,
        L => 0x4c,
        M => 0x4d,
        N => 0x4e,
        O => 0x4f,
        P => 0x50,
        Q => 0x51,
        R => 0x52,
        S => 0x53,
        T => 0x54,
        U => 0x55,
        V => 0x56,
        W => 0x57,
        X => 0x58,
        Y => 0x59,
        Z => 0x5a,
        _ => return None,
    };
    Some(code)
}
