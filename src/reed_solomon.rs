//! Reed-Solomon error correction over GF(2^8) with the QR field polynomial
//! x^8 + x^4 + x^3 + x^2 + 1 (0x11D).

/// Largest error correction block any version/level combination needs.
pub const MAX_DEGREE: usize = 30;

/// Divisor polynomial of a given degree, reusable for every block of a symbol.
pub struct ReedSolomonGenerator {
    divisor: [u8; MAX_DEGREE],
    degree: usize,
}

impl ReedSolomonGenerator {
    /// Builds the generator polynomial whose roots are α^0 .. α^(degree-1).
    ///
    /// # Panics
    ///
    /// Panics if `degree` is zero or greater than [`MAX_DEGREE`].
    pub fn new(degree: usize) -> Self {
        assert!((1..=MAX_DEGREE).contains(&degree), "Degree out of range");
        let mut result = Self {
            divisor: [0u8; MAX_DEGREE],
            degree,
        };
        // Coefficients are stored highest power first, leading 1 omitted
        let divisor: &mut [u8] = &mut result.divisor[..degree];
        divisor[degree - 1] = 1;
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                divisor[j] = multiply(divisor[j], root);
                if j + 1 < divisor.len() {
                    divisor[j] ^= divisor[j + 1];
                }
            }
            root = multiply(root, 0x02);
        }
        result
    }

    /// Writes the remainder of `data · x^degree` divided by the generator into `result`.
    pub fn compute_remainder(&self, data: &[u8], result: &mut [u8]) {
        assert_eq!(result.len(), self.degree);
        result.fill(0);
        for b in data {
            let factor: u8 = b ^ result[0];
            result.copy_within(1.., 0);
            result[result.len() - 1] = 0;
            for (x, &y) in result.iter_mut().zip(self.divisor.iter()) {
                *x ^= multiply(y, factor);
            }
        }
    }
}

/// Computes `ec_count` error correction codewords for one data block.
pub fn compute_ec_codewords(data: &[u8], ec_count: usize) -> Vec<u8> {
    let mut ecc = vec![0u8; ec_count];
    ReedSolomonGenerator::new(ec_count).compute_remainder(data, &mut ecc);
    ecc
}

/// Product of two field elements, Russian peasant style.
pub(crate) fn multiply(x: u8, y: u8) -> u8 {
    let mut z: u8 = 0;
    for i in (0..8).rev() {
        z = (z << 1) ^ ((z >> 7) * 0x1d);
        z ^= ((y >> i) & 1) * x;
    }
    z
}
