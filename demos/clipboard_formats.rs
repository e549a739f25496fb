//! Lists the formats of the object on the clipboard with the first bytes of
//! each rendering.
//!
//! Run with: cargo run --example clipboard_formats

#[cfg(windows)]
fn main() -> comscope::Result<()> {
    use comscope::config::ComApartment;
    use comscope::dataobj::{DataDirection, DataObject};
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
    let _apartment = ComApartment::ole()?;

    let clipboard = DataObject::clipboard()?;
    for format in clipboard.formats(DataDirection::Get)? {
        let name = format.format.describe();
        // GDI and metafile renderings have no byte view; report and go on.
        match clipboard.get_data(&format).and_then(|medium| medium.bytes()) {
            Ok(bytes) => println!("{name} [{}] {:02x?}", format.media, &bytes[..bytes.len().min(10)]),
            Err(err) => println!("{name} [{}] <{}>", format.media, err.hr()),
        }
    }
    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("clipboard_formats needs the Windows COM runtime");
}
