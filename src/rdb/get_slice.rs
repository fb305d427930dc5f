pub fn get_buffer_slice(buffer: &[u8], cursor: usize, len: usize) -> tokio::io::Result<&[u8]> {
    cursor
        .checked_add(len)
        .and_then(|end| buffer.get(cursor..end))
        .ok_or_else(|| {
            tokio::io::Error::new(
                tokio::io::ErrorKind::UnexpectedEof,
                "Not enough data in buffer",
            )
        })
}

pub fn get_fixed_bytes<const N: usize>(buffer: &[u8], cursor: usize) -> tokio::io::Result<[u8; N]> {
    let mut bytes = [0; N];
    bytes.copy_from_slice(get_buffer_slice(buffer, cursor, N)?);

    Ok(bytes)
}
