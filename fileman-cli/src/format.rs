// SPDX-License-Identifier: GPL-3.0-only

use num_format::{Locale, ToFormattedString};

/// Human-readable size, optionally followed by the exact byte count.
pub fn bytes_to_pretty(bytes: u64, add_bytes: bool) -> String {
    let mut steps = 0;
    let mut val = bytes as f64;

    while val >= 1024. && steps < 6 {
        val /= 1024.;
        steps += 1;
    }

    let unit = match steps {
        0 => "B",
        1 => "KiB",
        2 => "MiB",
        3 => "GiB",
        4 => "TiB",
        5 => "PiB",
        _ => "EiB",
    };

    let pretty = if steps == 0 {
        format!("{bytes} B")
    } else {
        format!("{val:.1} {unit}")
    };

    if add_bytes && steps > 0 {
        format!("{pretty} ({} bytes)", bytes.to_formatted_string(&Locale::en))
    } else {
        pretty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_sizes() {
        assert_eq!(bytes_to_pretty(512, true), "512 B");
        assert_eq!(bytes_to_pretty(1536, false), "1.5 KiB");
        assert_eq!(
            bytes_to_pretty(5_000_000, true),
            "4.8 MiB (5,000,000 bytes)"
        );
    }
}
