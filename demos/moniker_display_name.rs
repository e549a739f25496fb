//! Builds a composite moniker and prints its display name and components.
//!
//! Run with: cargo run --example moniker_display_name -- C:\path\to\file.xlsx Sheet1

#[cfg(windows)]
fn main() -> comscope::Result<()> {
    use comscope::config::ComApartment;
    use comscope::moniker::{BindCtx, Moniker};
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
    let _apartment = ComApartment::single_threaded()?;

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| r"C:\Windows\win.ini".to_string());
    let item = args.next().unwrap_or_else(|| "section".to_string());

    let composite = Moniker::compose(&Moniker::create_file(&path)?, &Moniker::create_item("!", &item)?)?;
    println!("display name: {}", composite.display_name()?);

    let bind_ctx = BindCtx::create()?;
    for component in composite.enum_forward()?.iter()? {
        let component = component?;
        println!(
            "  {:?}: {}",
            component.system_kind()?,
            component.display_name_with(&bind_ctx, None)?
        );
    }

    match Moniker::create_file(&path)?.enum_forward() {
        Ok(_) => println!("file moniker has components"),
        Err(err) => println!("file moniker has no components ({})", err.hr()),
    }
    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("moniker_display_name needs the Windows COM runtime");
}
