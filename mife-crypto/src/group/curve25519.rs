//! Curve25519 in Montgomery form `y² = x³ + 486662x² + x` over `GF(2^255 - 19)`,
//! restricted to the prime-order subgroup generated by the point with `x = 9`.

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use serde_json::{Value, json};

use crate::group::Group;

const A: u32 = 486662;
/// `(A + 2) / 4`, the ladder doubling constant.
const A24: u32 = 121666;

const BASE_Y: &str = "20ae19a1b8a086b4e01edd2c7748d14c923d4d7e6d7c61b229e9c5a27eced3d9";
const ORDER: &str = "1000000000000000000000000000000014def9dea2f79cd65812631a5cf5d3ed";

/// Affine point on the curve, or the point at infinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurvePoint {
    Infinity,
    Affine { x: BigUint, y: BigUint },
}

#[derive(Debug, Clone)]
pub struct Curve25519 {
    p: BigUint,
    a: BigUint,
    order: BigUint,
    base: CurvePoint,
}

impl Default for Curve25519 {
    fn default() -> Self {
        Self::new()
    }
}

impl Curve25519 {
    pub fn new() -> Self {
        let p = (BigUint::one() << 255u32) - 19u32;
        // Both constants are fixed hex literals.
        let y = BigUint::parse_bytes(BASE_Y.as_bytes(), 16).unwrap_or_default();
        let order = BigUint::parse_bytes(ORDER.as_bytes(), 16).unwrap_or_default();
        Self {
            p,
            a: BigUint::from(A),
            order,
            base: CurvePoint::Affine {
                x: BigUint::from(9u32),
                y,
            },
        }
    }

    fn fadd(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.p
    }

    fn fsub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        ((a + &self.p) - (b % &self.p)) % &self.p
    }

    fn fmul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.p
    }

    fn finv(&self, a: &BigUint) -> BigUint {
        a.modpow(&(&self.p - 2u32), &self.p)
    }

    pub fn is_on_curve(&self, point: &CurvePoint) -> bool {
        match point {
            CurvePoint::Infinity => true,
            CurvePoint::Affine { x, y } => {
                let lhs = self.fmul(y, y);
                let x2 = self.fmul(x, x);
                let rhs = self.fadd(
                    &self.fadd(&self.fmul(&x2, x), &self.fmul(&self.a, &x2)),
                    x,
                );
                lhs == rhs
            }
        }
    }

    fn double(&self, point: &CurvePoint) -> CurvePoint {
        let CurvePoint::Affine { x, y } = point else {
            return CurvePoint::Infinity;
        };
        if y.is_zero() {
            return CurvePoint::Infinity;
        }
        // λ = (3x² + 2Ax + 1) / 2y
        let x2 = self.fmul(x, x);
        let num = self.fadd(
            &self.fadd(&self.fmul(&BigUint::from(3u32), &x2), &self.fmul(&(&self.a << 1u32), x)),
            &BigUint::one(),
        );
        let lambda = self.fmul(&num, &self.finv(&self.fmul(&BigUint::from(2u32), y)));
        self.chord(&lambda, x, y, x)
    }

    /// Third intersection for slope `lambda` through `(x1, y1)` and a point with x-coordinate `x2`.
    fn chord(&self, lambda: &BigUint, x1: &BigUint, y1: &BigUint, x2: &BigUint) -> CurvePoint {
        let x3 = self.fsub(
            &self.fsub(&self.fsub(&self.fmul(lambda, lambda), &self.a), x1),
            x2,
        );
        let y3 = self.fsub(&self.fmul(lambda, &self.fsub(x1, &x3)), y1);
        CurvePoint::Affine { x: x3, y: y3 }
    }

    /// Reference double-and-add scalar multiplication.
    pub fn double_and_add(&self, point: &CurvePoint, k: &BigUint) -> CurvePoint {
        let mut acc = CurvePoint::Infinity;
        for i in (0..k.bits()).rev() {
            acc = self.double(&acc);
            if k.bit(i) {
                acc = self.add(&acc, point);
            }
        }
        acc
    }

    /// x-only Montgomery ladder with Okeya–Sakurai y-recovery.
    pub fn montgomery_ladder(&self, point: &CurvePoint, k: &BigUint) -> CurvePoint {
        let CurvePoint::Affine { x: xp, y: yp } = point else {
            return CurvePoint::Infinity;
        };
        if k.is_zero() {
            return CurvePoint::Infinity;
        }
        if yp.is_zero() {
            return self.double_and_add(point, k);
        }

        let a24 = BigUint::from(A24);
        let (mut x0, mut z0) = (BigUint::one(), BigUint::zero());
        let (mut x1, mut z1) = (xp.clone(), BigUint::one());

        let ladder_double = |x: &BigUint, z: &BigUint| {
            let a = self.fmul(&self.fadd(x, z), &self.fadd(x, z));
            let b = self.fmul(&self.fsub(x, z), &self.fsub(x, z));
            let c = self.fsub(&a, &b);
            let zz = self.fmul(&c, &self.fadd(&b, &self.fmul(&a24, &c)));
            (self.fmul(&a, &b), zz)
        };
        let ladder_add = |x0: &BigUint, z0: &BigUint, x1: &BigUint, z1: &BigUint| {
            let a = self.fmul(&self.fsub(x0, z0), &self.fadd(x1, z1));
            let b = self.fmul(&self.fadd(x0, z0), &self.fsub(x1, z1));
            let sum = self.fadd(&a, &b);
            let diff = self.fsub(&a, &b);
            (self.fmul(&sum, &sum), self.fmul(xp, &self.fmul(&diff, &diff)))
        };

        for i in (0..k.bits()).rev() {
            if k.bit(i) {
                (x0, z0) = ladder_add(&x0, &z0, &x1, &z1);
                (x1, z1) = ladder_double(&x1, &z1);
            } else {
                (x1, z1) = ladder_add(&x0, &z0, &x1, &z1);
                (x0, z0) = ladder_double(&x0, &z0);
            }
        }

        if z0.is_zero() {
            return CurvePoint::Infinity;
        }
        if z1.is_zero() {
            // (k + 1)·P is the identity, so y cannot be recovered from it
            return self.double_and_add(point, k);
        }

        let x0 = self.fmul(&x0, &self.finv(&z0));
        let x1 = self.fmul(&x1, &self.finv(&z1));
        let two_a = self.fmul(&BigUint::from(2u32), &self.a);
        let t1 = self.fadd(&self.fmul(xp, &x0), &BigUint::one());
        let t2 = self.fadd(&self.fadd(xp, &x0), &two_a);
        let d = self.fsub(xp, &x0);
        let num = self.fsub(
            &self.fsub(&self.fmul(&t1, &t2), &two_a),
            &self.fmul(&self.fmul(&d, &d), &x1),
        );
        let y0 = self.fmul(&num, &self.finv(&self.fmul(&BigUint::from(2u32), yp)));
        CurvePoint::Affine { x: x0, y: y0 }
    }
}

impl Group for Curve25519 {
    type Elem = CurvePoint;

    fn order(&self) -> &BigUint {
        &self.order
    }

    fn identity(&self) -> CurvePoint {
        CurvePoint::Infinity
    }

    fn generator(&self) -> CurvePoint {
        self.base.clone()
    }

    fn add(&self, a: &CurvePoint, b: &CurvePoint) -> CurvePoint {
        match (a, b) {
            (CurvePoint::Infinity, _) => b.clone(),
            (_, CurvePoint::Infinity) => a.clone(),
            (CurvePoint::Affine { x: x1, y: y1 }, CurvePoint::Affine { x: x2, y: y2 }) => {
                if x1 == x2 {
                    if self.fadd(y1, y2).is_zero() {
                        return CurvePoint::Infinity;
                    }
                    return self.double(a);
                }
                let lambda = self.fmul(&self.fsub(y2, y1), &self.finv(&self.fsub(x2, x1)));
                self.chord(&lambda, x1, y1, x2)
            }
        }
    }

    fn neg(&self, a: &CurvePoint) -> CurvePoint {
        match a {
            CurvePoint::Infinity => CurvePoint::Infinity,
            CurvePoint::Affine { x, y } => CurvePoint::Affine {
                x: x.clone(),
                y: self.fsub(&BigUint::zero(), y),
            },
        }
    }

    fn scalar_mul(&self, a: &CurvePoint, k: &BigInt) -> CurvePoint {
        self.montgomery_ladder(a, &self.reduce(k))
    }

    fn to_bytes(&self, a: &CurvePoint) -> Vec<u8> {
        match a {
            CurvePoint::Infinity => vec![0u8; 64],
            CurvePoint::Affine { x, y } => {
                let mut out = x.to_bytes_le();
                out.resize(32, 0);
                let mut yb = y.to_bytes_le();
                yb.resize(32, 0);
                out.extend(yb);
                out
            }
        }
    }

    fn export(&self) -> Value {
        json!({ "type": "curve25519" })
    }

    fn export_elem(&self, a: &CurvePoint) -> Value {
        match a {
            CurvePoint::Infinity => json!({ "type": "curve25519", "infinity": true }),
            CurvePoint::Affine { x, y } => json!({
                "type": "curve25519",
                "x": x.to_string(),
                "y": y.to_string(),
            }),
        }
    }
}
