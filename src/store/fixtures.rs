//! Synthetic employee records for demos and tests.

use fake::faker::job::en::Title;
use fake::faker::name::en::Name;
use fake::Fake;

use super::Employee;

/// Five-digit salaries, as the demo data always used.
const SALARY_RANGE: std::ops::Range<i64> = 10_000..100_000;

/// Builds one plausible employee with the given identifier.
pub fn fake_employee(id: i64) -> Employee {
    let name: String = Name().fake();
    let dept: String = Title().fake();
    let salary: i64 = SALARY_RANGE.fake();
    Employee::new(id, name, dept, salary as f64)
}

/// Builds `count` employees with sequential identifiers starting at `first_id`.
pub fn fake_employees(first_id: i64, count: usize) -> Vec<Employee> {
    (first_id..)
        .take(count)
        .map(fake_employee)
        .collect()
}
