//! Per-user password strategy

use pgplan_models::{Password, SecretResolution, UserSpec};
use rand::distributions::{Distribution, Uniform};
use rand::{CryptoRng, RngCore};

use crate::error::{ErrorKind, PlanError};
use crate::validators::{self, IdentifierKind};

pub const MIN_PASSWORD_LENGTH: u32 = 8;
pub const MAX_PASSWORD_LENGTH: u32 = 128;

/// Letters, digits and the specials Cloud SQL accepts without quoting trouble
const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&*()-_=+[]{}<>:?";

/// Decides how each user's password is obtained
pub struct SecretStrategy<'a> {
    instance_name: &'a str,
    default_length: u32,
    store_in_secret_manager: bool,
}

impl<'a> SecretStrategy<'a> {
    pub fn new(instance_name: &'a str, default_length: u32, store_in_secret_manager: bool) -> Self {
        Self {
            instance_name,
            default_length,
            store_in_secret_manager,
        }
    }

    /// An explicit `password_secret` is used verbatim; otherwise a password
    /// is generated and, when storing in the secret manager, given a secret id.
    ///
    /// Errors are relative to the user (`password_length`, `password_secret`).
    pub fn resolve<R: RngCore + CryptoRng>(
        &self,
        user_name: &str,
        user: &UserSpec,
        rng: &mut R,
    ) -> Result<SecretResolution, PlanError> {
        if let Some(reference) = &user.password_secret {
            if reference.trim().is_empty() {
                return Err(PlanError::new(ErrorKind::InvalidIdentifier, "password_secret", reference));
            }
            return Ok(SecretResolution::Referenced {
                secret: reference.clone(),
            });
        }

        let length = user.password_length.unwrap_or(self.default_length);
        if length < MIN_PASSWORD_LENGTH {
            return Err(PlanError::new(ErrorKind::PasswordTooShort, "password_length", length));
        }
        if length > MAX_PASSWORD_LENGTH {
            return Err(PlanError::new(ErrorKind::OutOfRange, "password_length", length));
        }

        let secret_id = if self.store_in_secret_manager {
            let id = format!("{}-{}-password", self.instance_name, user_name);
            validators::identifier(IdentifierKind::SecretId, "secret_id", &id)?;
            Some(id)
        } else {
            None
        };

        Ok(SecretResolution::Generated {
            password: generate_password(length as usize, rng),
            secret_id,
        })
    }
}

pub fn generate_password<R: RngCore + CryptoRng>(length: usize, rng: &mut R) -> Password {
    let index = Uniform::from(0..PASSWORD_ALPHABET.len());
    let value: String = (0..length)
        .map(|_| char::from(PASSWORD_ALPHABET[index.sample(rng)]))
        .collect();
    Password::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn user(length: Option<u32>) -> UserSpec {
        UserSpec {
            role: "readwrite".to_string(),
            password_length: length,
            password_secret: None,
        }
    }

    #[test]
    fn test_generated_with_secret_manager() {
        let mut rng = StdRng::seed_from_u64(7);
        let strategy = SecretStrategy::new("orders-db", 16, true);
        let resolution = strategy.resolve("app_user", &user(Some(24)), &mut rng).unwrap();
        match resolution {
            SecretResolution::Generated { password, secret_id } => {
                assert_eq!(password.len(), 24);
                assert_eq!(secret_id.as_deref(), Some("orders-db-app_user-password"));
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_default_length_and_no_secret_manager() {
        let mut rng = StdRng::seed_from_u64(7);
        let strategy = SecretStrategy::new("orders-db", 16, false);
        let resolution = strategy.resolve("app_user", &user(None), &mut rng).unwrap();
        assert_eq!(resolution.generated_password().map(Password::len), Some(16));
        assert_eq!(resolution.secret_id(), None);
    }

    #[test]
    fn test_explicit_reference_is_used_verbatim() {
        let mut rng = StdRng::seed_from_u64(7);
        let strategy = SecretStrategy::new("orders-db", 4, true);
        let mut spec = user(Some(2));
        spec.password_secret = Some("projects/p/secrets/app/versions/latest".to_string());
        let resolution = strategy.resolve("app_user", &spec, &mut rng).unwrap();
        assert_eq!(
            resolution,
            SecretResolution::Referenced {
                secret: "projects/p/secrets/app/versions/latest".to_string()
            }
        );
    }

    #[test]
    fn test_length_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let strategy = SecretStrategy::new("orders-db", 6, false);
        let err = strategy.resolve("app_user", &user(None), &mut rng).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PasswordTooShort);
        assert_eq!(err.value, "6");

        let err = strategy.resolve("app_user", &user(Some(129)), &mut rng).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let first = generate_password(32, &mut StdRng::seed_from_u64(42));
        let second = generate_password(32, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
        assert!(first.expose().bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
    }
}
