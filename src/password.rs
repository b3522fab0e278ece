use argon2::{
	password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Algorithm, Argon2, Params, Version,
};

/// Cost parameters for Argon2id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashParams {
	/// Memory cost in KiB.
	pub memory_cost: u32,
	pub time_cost: u32,
	pub parallelism: u32,
	pub output_len: usize,
}

impl Default for HashParams {
	fn default() -> Self {
		Self {
			memory_cost: 19_456,
			time_cost: 2,
			parallelism: 1,
			output_len: 32,
		}
	}
}

/// Salted, memory-hard password hashing.
///
/// Hashes are encoded as PHC strings, so the salt and the parameters used
/// travel with the hash and old hashes keep verifying after the configured
/// costs change.
#[derive(Clone)]
pub struct Hasher {
	argon2: Argon2<'static>,
}

impl Hasher {
	pub fn new(params: &HashParams) -> Result<Self, argon2::Error> {
		let params = Params::new(
			params.memory_cost,
			params.time_cost,
			params.parallelism,
			Some(params.output_len),
		)?;

		Ok(Self {
			argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
		})
	}

	/// Hashes a password with a freshly generated salt.
	pub fn hash(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
		let salt = SaltString::generate(&mut OsRng);

		Ok(self
			.argon2
			.hash_password(password.as_bytes(), &salt)?
			.to_string())
	}

	/// Checks a password against a stored PHC string.
	///
	/// A stored hash that cannot be parsed never verifies.
	pub fn verify(&self, hash: &str, password: &str) -> bool {
		let hash = match PasswordHash::new(hash) {
			Ok(hash) => hash,
			Err(error) => {
				tracing::warn!(%error, "stored password hash is malformed");
				return false;
			}
		};

		// the output comparison inside is constant-time
		self.argon2
			.verify_password(password.as_bytes(), &hash)
			.is_ok()
	}

	/// Spends roughly the work of [`Hasher::verify`] when there is no stored
	/// hash to check against. Always false.
	pub fn verify_absent(&self, password: &str) -> bool {
		let _ = self.hash(password);

		false
	}
}

#[cfg(test)]
pub(crate) fn test_params() -> HashParams {
	HashParams {
		memory_cost: 1024,
		time_cost: 1,
		parallelism: 1,
		output_len: 32,
	}
}
