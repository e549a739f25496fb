//! Writes to a memory stream, reads it back and prints its metadata.
//!
//! Run with: RUST_LOG=comscope=trace cargo run --example memory_stream

#[cfg(windows)]
fn main() -> comscope::Result<()> {
    use comscope::config::ComApartment;
    use comscope::stream::{ComStream, SeekOrigin};
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
    let _apartment = ComApartment::single_threaded()?;

    let stream = ComStream::create_on_memory(None)?;
    stream.write(b"Hello, ")?;
    stream.write("world".as_bytes())?;
    println!("position after writes: {}", stream.position()?);

    let contents = stream.read_all()?;
    println!("contents: {}", String::from_utf8_lossy(&contents));
    println!("position after read_all: {}", stream.position()?);

    stream.seek(-5, SeekOrigin::End)?;
    let mut tail = [0u8; 5];
    let read = stream.read(&mut tail)?;
    println!("tail: {}", String::from_utf8_lossy(&tail[..read]));

    let stat = stream.stat(false)?;
    println!("size: {} bytes, kind: {}", stat.size, stat.kind);
    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("memory_stream needs the Windows COM runtime");
}
