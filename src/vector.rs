//! Fixed-arity float vectors with swizzling.
//!
//! [`Vector<N>`] is a small `Copy` value used to hand colours, sizes and
//! positions to shader uniforms. Fields are named from the alphabet
//! `xyzwabcdefghijklmnopqrstuv`, so a 2-vector has `x` and `y`, a 4-vector
//! has `x`, `y`, `z` and `w`, and longer vectors continue with `a`, `b`, ...
//!
//! ```
//! use lavabottle::vector::{vec2, vec4, Vector};
//!
//! let v = vec4(1.0, 2.0, 3.0, 4.0);
//! let wx: Vector<2> = v.swizzle("wx").unwrap();
//! assert_eq!(wx, vec2(4.0, 1.0));
//! ```
//!
//! Arity is part of the type, so binary operations on mismatched arities
//! do not compile. An arity of zero or above the alphabet size is rejected
//! when the type is first constructed.

use std::fmt;
use std::ops::{Add, Div, Index, Mul, Neg, Sub};

use rand::Rng;

use crate::error::VectorError;

/// Field names in canonical order.
pub const FIELD_NAMES: [u8; 26] = *b"xyzwabcdefghijklmnopqrstuv";

const NO_FIELD: u8 = u8::MAX;

/// ASCII character -> field index.
const FIELD_INDEX: [u8; 128] = {
    let mut table = [NO_FIELD; 128];
    let mut i = 0;
    while i < FIELD_NAMES.len() {
        table[FIELD_NAMES[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Index of the field called `name`, regardless of arity.
pub fn field_index(name: char) -> Option<usize> {
    let code = name as usize;
    if code >= FIELD_INDEX.len() {
        return None;
    }
    match FIELD_INDEX[code] {
        NO_FIELD => None,
        index => Some(index as usize),
    }
}

/// An `N`-component `f32` vector.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Vector<const N: usize>([f32; N]);

pub type Vector2 = Vector<2>;
pub type Vector3 = Vector<3>;
pub type Vector4 = Vector<4>;

pub fn vec2(x: f32, y: f32) -> Vector2 {
    Vector::new([x, y])
}

pub fn vec3(x: f32, y: f32, z: f32) -> Vector3 {
    Vector::new([x, y, z])
}

pub fn vec4(x: f32, y: f32, z: f32, w: f32) -> Vector4 {
    Vector::new([x, y, z, w])
}

impl<const N: usize> Vector<N> {
    const ARITY_CHECK: () = assert!(
        N > 0 && N <= FIELD_NAMES.len(),
        "vector arity must be between 1 and the number of field names (26)"
    );

    pub const fn new(fields: [f32; N]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::ARITY_CHECK;
        Self(fields)
    }

    pub const fn splat(value: f32) -> Self {
        Self::new([value; N])
    }

    pub const fn zero() -> Self {
        Self::splat(0.0)
    }

    /// Build a vector from a slice of exactly `N` values.
    pub fn from_slice(values: &[f32]) -> Result<Self, VectorError> {
        let fields: [f32; N] = values.try_into().map_err(|_| VectorError::SliceLength {
            expected: N,
            actual: values.len(),
        })?;
        Ok(Self::new(fields))
    }

    /// A vector whose fields are independently uniform in `[0, 1)`.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::new(std::array::from_fn(|_| rng.gen::<f32>()))
    }

    /// Number of components.
    pub const fn arity(&self) -> usize {
        N
    }

    pub const fn to_array(self) -> [f32; N] {
        self.0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Value of the field called `name`, if this arity has it.
    pub fn field(&self, name: char) -> Option<f32> {
        field_index(name).filter(|&i| i < N).map(|i| self.0[i])
    }

    /// Gather fields by name into a new `M`-vector.
    ///
    /// Names may repeat and appear in any order; `pattern` must name
    /// exactly `M` fields.
    pub fn swizzle<const M: usize>(&self, pattern: &str) -> Result<Vector<M>, VectorError> {
        let actual = pattern.chars().count();
        if actual != M {
            return Err(VectorError::SwizzleLength {
                pattern: pattern.to_string(),
                expected: M,
                actual,
            });
        }
        let mut fields = [0.0; M];
        for (slot, name) in fields.iter_mut().zip(pattern.chars()) {
            *slot = self.field(name).ok_or(VectorError::UnknownField {
                field: name,
                arity: N,
            })?;
        }
        Ok(Vector::new(fields))
    }

    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self::new(self.0.map(f))
    }

    fn zip(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        Self::new(std::array::from_fn(|i| f(self.0[i], other.0[i])))
    }

    pub fn add(self, other: Self) -> Self {
        self + other
    }

    pub fn subtract(self, other: Self) -> Self {
        self - other
    }

    pub fn multiply(self, other: Self) -> Self {
        self * other
    }

    pub fn divide(self, other: Self) -> Self {
        self / other
    }

    pub fn fadd(self, scalar: f32) -> Self {
        self + scalar
    }

    pub fn fsubtract(self, scalar: f32) -> Self {
        self - scalar
    }

    pub fn fmultiply(self, scalar: f32) -> Self {
        self * scalar
    }

    pub fn fdivide(self, scalar: f32) -> Self {
        self / scalar
    }

    pub fn sum(self) -> f32 {
        self.0.iter().sum()
    }

    pub fn product(self) -> f32 {
        self.0.iter().product()
    }

    pub fn dot(self, other: Self) -> f32 {
        (self * other).sum()
    }

    pub fn magnitude(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Divide by the magnitude. The zero vector has no direction and
    /// normalizes to NaN components.
    pub fn normalize(self) -> Self {
        self / self.magnitude()
    }

    pub fn floor(self) -> Self {
        self.map(f32::floor)
    }

    pub fn ceil(self) -> Self {
        self.map(f32::ceil)
    }

    pub fn abs(self) -> Self {
        self.map(f32::abs)
    }

    pub fn negate(self) -> Self {
        -self
    }

    pub fn pow(self, expt: f32) -> Self {
        self.map(|v| v.powf(expt))
    }

    pub fn pow2(self) -> Self {
        self.map(|v| v * v)
    }

    pub fn pow3(self) -> Self {
        self.map(|v| v * v * v)
    }
}

impl Vector2 {
    pub fn x(&self) -> f32 {
        self.0[0]
    }

    pub fn y(&self) -> f32 {
        self.0[1]
    }
}

impl Vector3 {
    pub fn x(&self) -> f32 {
        self.0[0]
    }

    pub fn y(&self) -> f32 {
        self.0[1]
    }

    pub fn z(&self) -> f32 {
        self.0[2]
    }
}

impl Vector4 {
    pub fn x(&self) -> f32 {
        self.0[0]
    }

    pub fn y(&self) -> f32 {
        self.0[1]
    }

    pub fn z(&self) -> f32 {
        self.0[2]
    }

    pub fn w(&self) -> f32 {
        self.0[3]
    }
}

impl<const N: usize> Add for Vector<N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a + b)
    }
}

impl<const N: usize> Sub for Vector<N> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a - b)
    }
}

impl<const N: usize> Mul for Vector<N> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a * b)
    }
}

impl<const N: usize> Div for Vector<N> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a / b)
    }
}

impl<const N: usize> Add<f32> for Vector<N> {
    type Output = Self;

    fn add(self, rhs: f32) -> Self {
        self.map(|v| v + rhs)
    }
}

impl<const N: usize> Sub<f32> for Vector<N> {
    type Output = Self;

    fn sub(self, rhs: f32) -> Self {
        self.map(|v| v - rhs)
    }
}

impl<const N: usize> Mul<f32> for Vector<N> {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        self.map(|v| v * rhs)
    }
}

impl<const N: usize> Div<f32> for Vector<N> {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        self.map(|v| v / rhs)
    }
}

impl<const N: usize> Neg for Vector<N> {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

impl<const N: usize> Index<usize> for Vector<N> {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl<const N: usize> From<[f32; N]> for Vector<N> {
    fn from(fields: [f32; N]) -> Self {
        Self::new(fields)
    }
}

impl<const N: usize> From<Vector<N>> for [f32; N] {
    fn from(v: Vector<N>) -> Self {
        v.0
    }
}

impl From<glam::Vec2> for Vector2 {
    fn from(v: glam::Vec2) -> Self {
        Self::new(v.to_array())
    }
}

impl From<Vector2> for glam::Vec2 {
    fn from(v: Vector2) -> Self {
        glam::Vec2::from_array(v.0)
    }
}

impl From<glam::Vec3> for Vector3 {
    fn from(v: glam::Vec3) -> Self {
        Self::new(v.to_array())
    }
}

impl From<Vector3> for glam::Vec3 {
    fn from(v: Vector3) -> Self {
        glam::Vec3::from_array(v.0)
    }
}

impl From<glam::Vec4> for Vector4 {
    fn from(v: glam::Vec4) -> Self {
        Self::new(v.to_array())
    }
}

impl From<Vector4> for glam::Vec4 {
    fn from(v: Vector4) -> Self {
        glam::Vec4::from_array(v.0)
    }
}

impl<const N: usize> fmt::Display for Vector<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Vec{} (", N)?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_field_index_table() {
        assert_eq!(field_index('x'), Some(0));
        assert_eq!(field_index('w'), Some(3));
        assert_eq!(field_index('a'), Some(4));
        assert_eq!(field_index('v'), Some(25));
        assert_eq!(field_index('A'), None);
        assert_eq!(field_index('é'), None);
    }

    #[test]
    fn test_swizzle_reorders_and_repeats() {
        let v = vec3(1.0, 2.0, 3.0);
        assert_eq!(v.swizzle::<2>("yx").unwrap(), vec2(2.0, 1.0));
        assert_eq!(v.swizzle::<2>("xx").unwrap(), vec2(1.0, 1.0));
        assert_eq!(v.swizzle::<4>("zzyx").unwrap(), vec4(3.0, 3.0, 2.0, 1.0));
    }

    #[test]
    fn test_swizzle_rejects_fields_beyond_arity() {
        let v = vec2(1.0, 2.0);
        assert_eq!(
            v.swizzle::<2>("xz"),
            Err(VectorError::UnknownField { field: 'z', arity: 2 })
        );
        assert_eq!(
            v.swizzle::<1>("q"),
            Err(VectorError::UnknownField { field: 'q', arity: 2 })
        );
    }

    #[test]
    fn test_swizzle_rejects_wrong_length() {
        let v = vec4(1.0, 2.0, 3.0, 4.0);
        let err = v.swizzle::<3>("xy").unwrap_err();
        assert_eq!(
            err,
            VectorError::SwizzleLength {
                pattern: "xy".into(),
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_long_vectors_use_extended_alphabet() {
        let v = Vector::<6>::new([0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(v.field('a'), Some(4.0));
        assert_eq!(v.field('b'), Some(5.0));
        assert_eq!(v.field('c'), None);
        assert_eq!(v.swizzle::<2>("ba").unwrap(), vec2(5.0, 4.0));
    }

    #[test]
    fn test_scalar_ops_broadcast() {
        let v = vec3(1.0, 2.0, 4.0);
        assert_eq!(v.fadd(1.0), vec3(2.0, 3.0, 5.0));
        assert_eq!(v.fsubtract(1.0), vec3(0.0, 1.0, 3.0));
        assert_eq!(v.fmultiply(2.0), vec3(2.0, 4.0, 8.0));
        assert_eq!(v.fdivide(2.0), vec3(0.5, 1.0, 2.0));
    }

    #[test]
    fn test_operands_are_untouched() {
        let a = vec2(1.0, 2.0);
        let b = vec2(3.0, 5.0);
        let _ = a.add(b).multiply(b);
        assert_eq!(a, vec2(1.0, 2.0));
        assert_eq!(b, vec2(3.0, 5.0));
    }

    #[test]
    fn test_elementwise_functions() {
        let v = vec4(-1.5, 2.5, -0.0, 3.0);
        assert_eq!(v.floor(), vec4(-2.0, 2.0, -0.0, 3.0));
        assert_eq!(v.ceil(), vec4(-1.0, 3.0, -0.0, 3.0));
        assert_eq!(v.abs(), vec4(1.5, 2.5, 0.0, 3.0));
        assert_eq!(v.negate(), vec4(1.5, -2.5, 0.0, -3.0));
        assert_eq!(vec2(2.0, 3.0).pow2(), vec2(4.0, 9.0));
        assert_eq!(vec2(2.0, 3.0).pow3(), vec2(8.0, 27.0));
        assert_relative_eq!(vec2(4.0, 9.0).pow(0.5)[1], 3.0, epsilon = 1e-6);
        assert_eq!(vec3(2.0, 3.0, 4.0).product(), 24.0);
        assert_eq!(vec3(2.0, 3.0, 4.0).sum(), 9.0);
    }

    #[test]
    fn test_magnitude_and_dot() {
        let v = vec2(3.0, 4.0);
        assert_relative_eq!(v.magnitude(), 5.0);
        assert_relative_eq!(v.dot(vec2(1.0, 1.0)), 7.0);
        assert_relative_eq!(v.normalize().magnitude(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_zero_is_nan() {
        let n = Vector3::zero().normalize();
        assert!(n.as_slice().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_array_round_trip() {
        let v = vec4(1.0, 2.0, 3.0, 4.0);
        let back = Vector::<4>::from_slice(&v.to_array()).unwrap();
        assert_eq!(back, v);
        assert_eq!(
            Vector::<3>::from_slice(&[1.0, 2.0]),
            Err(VectorError::SliceLength { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn test_random_fields_in_unit_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let v = Vector::<4>::random(&mut rng);
            assert!(v.as_slice().iter().all(|c| (0.0..1.0).contains(c)));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(vec2(1.0, 2.5).to_string(), "[Vec2 (1, 2.5)]");
    }

    #[test]
    fn test_glam_conversion() {
        let g: glam::Vec3 = vec3(1.0, 2.0, 3.0).into();
        assert_eq!(g, glam::Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Vector4::from(glam::Vec4::ONE), Vector4::splat(1.0));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-3;

    fn arb_vec<const N: usize>() -> impl Strategy<Value = Vector<N>> {
        proptest::collection::vec(-100.0..100.0_f32, N)
            .prop_map(|values| Vector::from_slice(&values).unwrap())
    }

    fn arb_pattern(arity: usize, len: usize) -> impl Strategy<Value = String> {
        proptest::collection::vec(0..arity, len).prop_map(|indices| {
            indices
                .into_iter()
                .map(|i| FIELD_NAMES[i] as char)
                .collect()
        })
    }

    fn assert_swizzle<const N: usize, const M: usize>(v: Vector<N>, pattern: &str) {
        let out: Vector<M> = v.swizzle(pattern).unwrap();
        for (i, name) in pattern.chars().enumerate() {
            assert_eq!(out[i], v.field(name).unwrap());
        }
    }

    proptest! {
        #[test]
        fn swizzle_gathers_named_fields_vec2(
            v in arb_vec::<2>(),
            p2 in arb_pattern(2, 2),
            p3 in arb_pattern(2, 3),
            p4 in arb_pattern(2, 4),
        ) {
            assert_swizzle::<2, 2>(v, &p2);
            assert_swizzle::<2, 3>(v, &p3);
            assert_swizzle::<2, 4>(v, &p4);
        }

        #[test]
        fn swizzle_gathers_named_fields_vec3(
            v in arb_vec::<3>(),
            p2 in arb_pattern(3, 2),
            p3 in arb_pattern(3, 3),
            p4 in arb_pattern(3, 4),
        ) {
            assert_swizzle::<3, 2>(v, &p2);
            assert_swizzle::<3, 3>(v, &p3);
            assert_swizzle::<3, 4>(v, &p4);
        }

        #[test]
        fn swizzle_gathers_named_fields_vec4(
            v in arb_vec::<4>(),
            p2 in arb_pattern(4, 2),
            p3 in arb_pattern(4, 3),
            p4 in arb_pattern(4, 4),
        ) {
            assert_swizzle::<4, 2>(v, &p2);
            assert_swizzle::<4, 3>(v, &p3);
            assert_swizzle::<4, 4>(v, &p4);
        }

        #[test]
        fn add_then_subtract_is_identity(a in arb_vec::<4>(), b in arb_vec::<4>()) {
            let back = a.add(b).subtract(b);
            for i in 0..4 {
                prop_assert!((back[i] - a[i]).abs() < EPS, "{} vs {}", back, a);
            }
        }

        #[test]
        fn zero_is_additive_identity(a in arb_vec::<3>()) {
            prop_assert_eq!(a + Vector3::zero(), a);
        }

        #[test]
        fn magnitude_is_root_sum_of_squares(a in arb_vec::<3>()) {
            let expected = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
            prop_assert!((a.magnitude() - expected).abs() <= EPS * expected.max(1.0));
        }

        #[test]
        fn normalize_has_unit_length(a in arb_vec::<4>()) {
            prop_assume!(a.magnitude() > 1e-3);
            prop_assert!((a.normalize().magnitude() - 1.0).abs() < EPS);
        }
    }
}
