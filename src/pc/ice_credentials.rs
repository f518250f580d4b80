use rand::{Rng, RngCore, rngs::OsRng};

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// ICE: ufrag >= 4 chars; pwd >= 22 chars
pub const ICE_UFRAG_LEN: usize = 8;
pub const ICE_PWD_LEN: usize = 24;
pub const CNAME_LEN: usize = 16;

/// Random alphanumeric token of `len` characters.
pub fn gen_token(len: usize) -> String {
    let mut s = String::with_capacity(len);
    for _ in 0..len {
        let idx = OsRng.gen_range(0..ALPHABET.len());
        s.push(ALPHABET[idx] as char);
    }
    s
}

/// Non-zero random SSRC different from every entry of `taken`.
pub fn random_ssrc(taken: &[u32]) -> u32 {
    loop {
        let ssrc = OsRng.next_u32();
        if ssrc != 0 && !taken.contains(&ssrc) {
            return ssrc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_alphanumeric_and_sized() {
        let t = gen_token(ICE_PWD_LEN);
        assert_eq!(t.len(), ICE_PWD_LEN);
        assert!(t.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_ne!(gen_token(ICE_PWD_LEN), t);
    }

    #[test]
    fn ssrc_avoids_taken_values() {
        let first = random_ssrc(&[]);
        let second = random_ssrc(&[first]);
        assert_ne!(first, 0);
        assert_ne!(first, second);
    }
}
