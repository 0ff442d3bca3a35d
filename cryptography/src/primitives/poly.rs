//! Shamir secret sharing over a [Group]'s scalar field, with public commitments in the group.
//!
//! A [PriPoly] of threshold `t` is a degree `t-1` polynomial whose constant term is the shared
//! secret. Shares are evaluations at `x = index` for non-zero indices (index `0` is the secret
//! itself). A [PubPoly] commits to every coefficient in the group so anyone can check a share
//! without learning it.
//!
//! # Warning
//!
//! Interpolation uses the first `t` evaluations it is given, in input order. Callers are
//! responsible for filtering out invalid shares first.

use crate::primitives::{
    group::{Element, Group, Point, Scalar},
    Error,
};
use rand_core::CryptoRngCore;
use std::{
    collections::BTreeSet,
    fmt::{Debug, Formatter},
};
use zeroize::Zeroize;

/// A polynomial evaluation at a specific index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eval<C> {
    pub index: u32,
    pub value: C,
}

/// A share of a private polynomial.
pub type PriShare<G> = Eval<<G as Group>::Scalar>;

/// A share of a public polynomial.
pub type PubShare<G> = Eval<<G as Group>::Point>;

/// A private polynomial `(a_0, ..., a_{t-1})` over the scalar field.
#[derive(Clone)]
pub struct PriPoly<G: Group> {
    coeffs: Vec<G::Scalar>,
}

impl<G: Group> PriPoly<G> {
    /// Returns a random polynomial of threshold `t`.
    ///
    /// If `secret` is provided it is used as the constant term, otherwise the constant term is
    /// sampled along with the other coefficients.
    pub fn new<R: CryptoRngCore + ?Sized>(
        t: u32,
        secret: Option<G::Scalar>,
        rng: &mut R,
    ) -> Result<Self, Error> {
        if t < 2 {
            return Err(Error::ThresholdTooSmall(t));
        }
        let mut coeffs = Vec::with_capacity(t as usize);
        coeffs.push(secret.unwrap_or_else(|| G::Scalar::random(rng)));
        for _ in 1..t {
            coeffs.push(G::Scalar::random(rng));
        }
        Ok(Self { coeffs })
    }

    /// Creates a polynomial from its coefficients (constant term first).
    pub fn from_coefficients(coeffs: Vec<G::Scalar>) -> Result<Self, Error> {
        if coeffs.len() < 2 {
            return Err(Error::ThresholdTooSmall(coeffs.len() as u32));
        }
        Ok(Self { coeffs })
    }

    /// Returns the number of shares required to recover the secret.
    pub fn threshold(&self) -> u32 {
        self.coeffs.len() as u32
    }

    /// Returns the constant term.
    pub fn secret(&self) -> &G::Scalar {
        &self.coeffs[0]
    }

    /// Returns the coefficients (constant term first).
    pub fn coefficients(&self) -> &[G::Scalar] {
        &self.coeffs
    }

    /// Evaluates the polynomial at `x = i`.
    pub fn eval(&self, i: u32) -> PriShare<G> {
        let xi = G::Scalar::from_u32(i);

        // Horner's method
        let value = self.coeffs.iter().rev().fold(G::scalar(), |mut sum, coeff| {
            sum.mul(&xi);
            sum.add(coeff);
            sum
        });
        Eval { index: i, value }
    }

    /// Returns the shares at indices `1..=n`.
    pub fn shares(&self, n: u32) -> Vec<PriShare<G>> {
        (1..=n).map(|i| self.eval(i)).collect()
    }

    /// Commits to every coefficient with `base` (the group generator if absent).
    pub fn commit(&self, base: Option<&G::Point>) -> PubPoly<G> {
        let base = base.cloned().unwrap_or_else(G::Point::generator);
        let commits = self
            .coeffs
            .iter()
            .map(|c| {
                let mut commitment = base.clone();
                commitment.mul(c);
                commitment
            })
            .collect();
        PubPoly { base, commits }
    }

    /// Returns the coefficient-wise sum of two polynomials of the same threshold.
    pub fn add(&self, other: &Self) -> Result<Self, Error> {
        if self.coeffs.len() != other.coeffs.len() {
            return Err(Error::DegreeMismatch(self.coeffs.len(), other.coeffs.len()));
        }
        let coeffs = self
            .coeffs
            .iter()
            .zip(&other.coeffs)
            .map(|(a, b)| {
                let mut sum = a.clone();
                sum.add(b);
                sum
            })
            .collect();
        Ok(Self { coeffs })
    }
}

impl<G: Group> PartialEq for PriPoly<G> {
    fn eq(&self, other: &Self) -> bool {
        if self.coeffs.len() != other.coeffs.len() {
            return false;
        }

        // Compare every coefficient without short-circuiting
        self.coeffs
            .iter()
            .zip(&other.coeffs)
            .fold(true, |acc, (a, b)| acc & (a == b))
    }
}

impl<G: Group> Eq for PriPoly<G> {}

impl<G: Group> Debug for PriPoly<G> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriPoly")
            .field("threshold", &self.coeffs.len())
            .finish_non_exhaustive()
    }
}

impl<G: Group> Drop for PriPoly<G> {
    fn drop(&mut self) {
        self.coeffs.iter_mut().for_each(Zeroize::zeroize);
    }
}

/// Commitments `(A_0, ..., A_{t-1})` to a private polynomial, where `A_i = a_i·base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubPoly<G: Group> {
    base: G::Point,
    commits: Vec<G::Point>,
}

impl<G: Group> PubPoly<G> {
    /// Creates a public polynomial from its commitments (the group generator is used if `base` is
    /// absent).
    pub fn new(base: Option<G::Point>, commits: Vec<G::Point>) -> Result<Self, Error> {
        if commits.len() < 2 {
            return Err(Error::ThresholdTooSmall(commits.len() as u32));
        }
        Ok(Self {
            base: base.unwrap_or_else(G::Point::generator),
            commits,
        })
    }

    /// Returns the base the coefficients were committed with.
    pub fn base(&self) -> &G::Point {
        &self.base
    }

    /// Returns the commitments (constant term first).
    pub fn commits(&self) -> &[G::Point] {
        &self.commits
    }

    /// Returns the commitment to the secret, `A_0`.
    pub fn commit(&self) -> &G::Point {
        &self.commits[0]
    }

    /// Returns the number of shares required to recover the committed secret.
    pub fn threshold(&self) -> u32 {
        self.commits.len() as u32
    }

    /// Evaluates the polynomial at `x = i`.
    pub fn eval(&self, i: u32) -> PubShare<G> {
        let xi = G::Scalar::from_u32(i);

        // Horner's method
        let value = self.commits.iter().rev().fold(G::point(), |mut sum, coeff| {
            sum.mul(&xi);
            sum.add(coeff);
            sum
        });
        Eval { index: i, value }
    }

    /// Returns the public shares at indices `1..=n`.
    pub fn shares(&self, n: u32) -> Vec<PubShare<G>> {
        (1..=n).map(|i| self.eval(i)).collect()
    }

    /// Returns the coefficient-wise sum of two public polynomials committed with the same base.
    pub fn add(&self, other: &Self) -> Result<Self, Error> {
        if self.base != other.base {
            return Err(Error::GroupMismatch);
        }
        if self.commits.len() != other.commits.len() {
            return Err(Error::DegreeMismatch(
                self.commits.len(),
                other.commits.len(),
            ));
        }
        let commits = self
            .commits
            .iter()
            .zip(&other.commits)
            .map(|(a, b)| {
                let mut sum = a.clone();
                sum.add(b);
                sum
            })
            .collect();
        Ok(Self {
            base: self.base.clone(),
            commits,
        })
    }

    /// Returns whether `share` lies on the committed polynomial.
    pub fn check(&self, share: &PriShare<G>) -> bool {
        let expected = self.eval(share.index).value;
        let mut actual = self.base.clone();
        actual.mul(&share.value);
        expected == actual
    }
}

/// Returns the first `t` evaluations, checking their indices are distinct.
fn select<C>(evals: &[Eval<C>], t: u32) -> Result<&[Eval<C>], Error> {
    let t = t as usize;
    if t == 0 || evals.len() < t {
        return Err(Error::NotEnoughShares {
            got: evals.len(),
            need: t,
        });
    }
    let selected = &evals[..t];
    let mut seen = BTreeSet::new();
    for eval in selected {
        if !seen.insert(eval.index) {
            return Err(Error::DuplicateIndex(eval.index));
        }
    }
    Ok(selected)
}

/// Computes the Lagrange coefficients `l_j(0) = prod_{m != j} x_m / (x_m - x_j)`.
fn lagrange_at_zero<G: Group>(indices: &[u32]) -> Result<Vec<G::Scalar>, Error> {
    let xs = indices
        .iter()
        .map(|i| G::Scalar::from_u32(*i))
        .collect::<Vec<_>>();
    xs.iter()
        .enumerate()
        .map(|(j, xj)| {
            let (mut num, den) = xs.iter().enumerate().filter(|(m, _)| *m != j).fold(
                (G::Scalar::one(), G::Scalar::one()),
                |(mut num, mut den), (_, xm)| {
                    num.mul(xm);
                    let mut diff = xm.clone();
                    diff.sub(xj);
                    den.mul(&diff);
                    (num, den)
                },
            );
            num.div(&den)?;
            Ok(num)
        })
        .collect()
}

/// Computes the coefficients of every Lagrange basis polynomial
/// `L_j(X) = prod_{m != j} (X - x_m) / (x_j - x_m)`.
fn lagrange_basis<G: Group>(indices: &[u32]) -> Result<Vec<Vec<G::Scalar>>, Error> {
    let xs = indices
        .iter()
        .map(|i| G::Scalar::from_u32(*i))
        .collect::<Vec<_>>();
    xs.iter()
        .enumerate()
        .map(|(j, xj)| {
            let mut basis = vec![G::Scalar::one()];
            let mut den = G::Scalar::one();
            for (m, xm) in xs.iter().enumerate() {
                if m == j {
                    continue;
                }

                // Multiply the basis by (X - x_m)
                let mut next = vec![G::scalar(); basis.len() + 1];
                for (k, coeff) in basis.iter().enumerate() {
                    let mut shifted = coeff.clone();
                    next[k + 1].add(&shifted);
                    shifted.mul(xm);
                    next[k].sub(&shifted);
                }
                basis = next;

                // Accumulate (x_j - x_m)
                let mut diff = xj.clone();
                diff.sub(xm);
                den.mul(&diff);
            }
            let inv = den.inverse()?;
            basis.iter_mut().for_each(|c| c.mul(&inv));
            Ok(basis)
        })
        .collect()
}

/// Recovers the secret from the first `t` shares.
pub fn recover_secret<G: Group>(shares: &[PriShare<G>], t: u32) -> Result<G::Scalar, Error> {
    let selected = select(shares, t)?;
    let indices = selected.iter().map(|s| s.index).collect::<Vec<_>>();
    let lagrange = lagrange_at_zero::<G>(&indices)?;
    Ok(selected
        .iter()
        .zip(lagrange)
        .fold(G::scalar(), |mut acc, (share, l)| {
            let mut term = share.value.clone();
            term.mul(&l);
            acc.add(&term);
            acc
        }))
}

/// Recovers the commitment to the secret from the first `t` public shares.
pub fn recover_commit<G: Group>(shares: &[PubShare<G>], t: u32) -> Result<G::Point, Error> {
    let selected = select(shares, t)?;
    let indices = selected.iter().map(|s| s.index).collect::<Vec<_>>();
    let lagrange = lagrange_at_zero::<G>(&indices)?;
    Ok(selected
        .iter()
        .zip(lagrange)
        .fold(G::point(), |mut acc, (share, l)| {
            let mut term = share.value.clone();
            term.mul(&l);
            acc.add(&term);
            acc
        }))
}

/// Recovers the full private polynomial from the first `t` shares.
pub fn recover_pri_poly<G: Group>(shares: &[PriShare<G>], t: u32) -> Result<PriPoly<G>, Error> {
    let selected = select(shares, t)?;
    let indices = selected.iter().map(|s| s.index).collect::<Vec<_>>();
    let basis = lagrange_basis::<G>(&indices)?;
    let mut coeffs = vec![G::scalar(); t as usize];
    for (share, poly) in selected.iter().zip(basis) {
        for (acc, b) in coeffs.iter_mut().zip(poly) {
            let mut term = b;
            term.mul(&share.value);
            acc.add(&term);
        }
    }
    PriPoly::from_coefficients(coeffs)
}

/// Recovers the full public polynomial (with the generator as base) from the first `t` public
/// shares.
pub fn recover_pub_poly<G: Group>(shares: &[PubShare<G>], t: u32) -> Result<PubPoly<G>, Error> {
    let selected = select(shares, t)?;
    let indices = selected.iter().map(|s| s.index).collect::<Vec<_>>();
    let basis = lagrange_basis::<G>(&indices)?;
    let mut commits = vec![G::point(); t as usize];
    for (share, poly) in selected.iter().zip(basis) {
        for (acc, b) in commits.iter_mut().zip(poly) {
            let mut term = share.value.clone();
            term.mul(&b);
            acc.add(&term);
        }
    }
    PubPoly::new(None, commits)
}
