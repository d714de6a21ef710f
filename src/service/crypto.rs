use argon2::{
   password_hash::{rand_core::OsRng, Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
   Argon2,
};

/// Argon2id hash in PHC string format.
pub fn hash_password(pwd: &str) -> Result<String, Error> {
   let salt = SaltString::generate(&mut OsRng);
   Ok(Argon2::default().hash_password(pwd.as_bytes(), &salt)?.to_string())
}

/// `Ok(false)` on mismatch; a malformed stored hash is an error.
pub fn verify_password(pwd: &str, stored: &str) -> Result<bool, Error> {
   let parsed = PasswordHash::new(stored)?;
   match Argon2::default().verify_password(pwd.as_bytes(), &parsed) {
      Ok(()) => Ok(true),
      Err(Error::Password) => Ok(false),
      Err(err) => Err(err),
   }
}
