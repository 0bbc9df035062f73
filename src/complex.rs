//! Minimal complex arithmetic on top of `num_complex`.
//!
//! The engine uses `num_complex::Complex<f64>` everywhere (it is also the
//! scalar of the nalgebra Jones types). These free functions give the
//! arithmetic the names the rest of the crate and its callers use.

pub type Complex = num_complex::Complex<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_with_conjugate_is_real() {
        let z = create(3.0, 4.0);
        let p = mul(z, conjugate(z));
        assert!((p.re - 25.0).abs() < 1e-10, "re: {}", p.re);
        assert!(p.im.abs() < 1e-10, "im: {}", p.im);
    }

    #[test]
    fn magnitude_of_pythagorean_pair() {
        let z = create(3.0, -4.0);
        assert!((magnitude(z) - 5.0).abs() < 1e-12);
        assert!((magnitude_sq(z) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn add_and_scale() {
        let z = add(create(1.0, 2.0), create(-0.5, 0.5));
        let z = scale(z, 2.0);
        assert_eq!(z, create(1.0, 5.0));
    }
}

pub fn create(re: f64, im: f64) -> Complex {
    Complex::new(re, im)
}

pub fn add(a: Complex, b: Complex) -> Complex {
    a + b
}

pub fn mul(a: Complex, b: Complex) -> Complex {
    a * b
}

pub fn scale(a: Complex, k: f64) -> Complex {
    a * k
}

pub fn conjugate(a: Complex) -> Complex {
    a.conj()
}

pub fn magnitude(a: Complex) -> f64 {
    a.norm()
}

/// Squared magnitude, `re² + im²`, without the square root.
pub fn magnitude_sq(a: Complex) -> f64 {
    a.norm_sqr()
}

/// Unit phasor `e^{iφ}` for a phase in radians.
pub fn phasor(phase: f64) -> Complex {
    Complex::from_polar(1.0, phase)
}
