//! Lists the registered component categories and the classes of one of them.
//!
//! Run with: cargo run --example component_categories

#[cfg(windows)]
fn main() -> comscope::Result<()> {
    use comscope::comcat::CategoryInformation;
    use comscope::config::ComApartment;
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
    let _apartment = ComApartment::single_threaded()?;

    let manager = CategoryInformation::create()?;
    let categories = manager.categories(0)?;
    for info in &categories {
        println!("{} {:#06x} {}", info.catid, info.lcid, info.description);
    }

    if let Some(first) = categories.first() {
        let classes = manager.classes_of_categories(Some(&[first.catid]), &[])?.to_vec()?;
        println!("{} classes implement {}", classes.len(), first.description);
    }
    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("component_categories needs the Windows COM runtime");
}
