//! The reference broker's static mode vocabulary: one constructor per mode
//! id, each returning the descriptor `synthesize_candidate_modes` hands back
//! when the client's advertised layouts make that mode available.

use authd_schemas::{ModeDescriptor, UiLayoutInfo};

fn ui(pairs: &[(&str, &str)]) -> UiLayoutInfo {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn password() -> ModeDescriptor {
    ModeDescriptor {
        id: "password".to_string(),
        selection_label: "Password".to_string(),
        ui: ui(&[
            ("type", "form"),
            ("label", "Enter your password"),
            ("entry", "chars_password"),
        ]),
        is_mfa: false,
        phone: None,
        email: None,
        wanted_code: None,
    }
}

pub fn pincode() -> ModeDescriptor {
    ModeDescriptor {
        id: "pincode".to_string(),
        selection_label: "Pin code".to_string(),
        ui: ui(&[
            ("type", "form"),
            ("label", "Enter your 4-digit pin code"),
            ("entry", "digits"),
        ]),
        is_mfa: false,
        phone: None,
        email: None,
        wanted_code: None,
    }
}

pub fn totp(with_button: bool) -> ModeDescriptor {
    let mut fields = vec![
        ("type", "form"),
        ("label", "Enter your one-time code"),
        ("entry", "digits"),
    ];
    if with_button {
        fields.push(("button", "optional"));
    }
    ModeDescriptor {
        id: if with_button { "totp_with_button" } else { "totp" }.to_string(),
        selection_label: "One-time code".to_string(),
        ui: ui(&fields),
        is_mfa: true,
        phone: None,
        email: None,
        wanted_code: None,
    }
}

pub fn phoneack1() -> ModeDescriptor {
    ModeDescriptor {
        id: "phoneack1".to_string(),
        selection_label: "Phone confirmation".to_string(),
        ui: ui(&[("type", "form"), ("label", "Unlock your phone to approve"), ("wait", "true")]),
        is_mfa: true,
        phone: Some("+33 1 23 45 67 89".to_string()),
        email: None,
        wanted_code: None,
    }
}

pub fn phoneack2() -> ModeDescriptor {
    ModeDescriptor {
        id: "phoneack2".to_string(),
        selection_label: "Phone confirmation (unreachable)".to_string(),
        ui: ui(&[
            ("type", "form"),
            ("label", "Unlock your phone to approve"),
            ("wait", "true"),
        ]),
        is_mfa: true,
        phone: Some("+33 1 23 45 67 90".to_string()),
        email: None,
        wanted_code: None,
    }
}

pub fn fidodevice1() -> ModeDescriptor {
    ModeDescriptor {
        id: "fidodevice1".to_string(),
        selection_label: "Security key".to_string(),
        ui: ui(&[
            ("type", "form"),
            ("label", "Plug in your FIDO device and press its button"),
            ("wait", "true"),
        ]),
        is_mfa: true,
        phone: None,
        email: None,
        wanted_code: None,
    }
}

pub fn email_mode(username: &str) -> ModeDescriptor {
    let id = format!("entry_or_wait_for_{username}_gmail.com");
    ModeDescriptor {
        id: id.clone(),
        selection_label: "Email confirmation".to_string(),
        ui: ui(&[
            ("type", "form"),
            ("label", "Enter the code from your email or wait for the link"),
            ("entry", "chars"),
            ("wait", "true"),
        ]),
        is_mfa: true,
        phone: None,
        email: Some(format!("{username}@gmail.com")),
        wanted_code: None,
    }
}

pub fn qrcodewithtypo() -> ModeDescriptor {
    ModeDescriptor {
        id: "qrcodewithtypo".to_string(),
        selection_label: "QR code".to_string(),
        ui: ui(&[("type", "qrcode"), ("label", "Scan the QR code with your device")]),
        is_mfa: true,
        phone: None,
        email: None,
        wanted_code: None,
    }
}

pub fn qrcodeandcodewithtypo() -> ModeDescriptor {
    ModeDescriptor {
        id: "qrcodeandcodewithtypo".to_string(),
        selection_label: "QR code".to_string(),
        ui: ui(&[
            ("type", "qrcode"),
            ("label", "Scan the QR code with your device or type the code"),
        ]),
        is_mfa: true,
        phone: None,
        email: None,
        wanted_code: None,
    }
}

pub fn codewithtypo() -> ModeDescriptor {
    ModeDescriptor {
        id: "codewithtypo".to_string(),
        selection_label: "Confirmation code".to_string(),
        ui: ui(&[("type", "qrcode"), ("label", "Type this code on your other device")]),
        is_mfa: true,
        phone: None,
        email: None,
        wanted_code: None,
    }
}

pub fn mandatoryreset() -> ModeDescriptor {
    ModeDescriptor {
        id: "mandatoryreset".to_string(),
        selection_label: "Change your password".to_string(),
        ui: ui(&[
            ("type", "newpassword"),
            ("label", "Your password has expired, choose a new one"),
            ("entry", "chars_password"),
        ]),
        is_mfa: false,
        phone: None,
        email: None,
        wanted_code: None,
    }
}

pub fn optionalreset() -> ModeDescriptor {
    ModeDescriptor {
        id: "optionalreset".to_string(),
        selection_label: "Change your password (optional)".to_string(),
        ui: ui(&[
            ("type", "newpassword"),
            ("label", "You may choose a new password"),
            ("entry", "chars_password"),
            ("button", "skip"),
        ]),
        is_mfa: false,
        phone: None,
        email: None,
        wanted_code: None,
    }
}
